//! Artifact provisioning from S3.
//!
//! Before context loading, every required parquet artifact must exist in
//! the data directory. When any is missing and a bucket is configured,
//! the whole bucket prefix is mirrored locally: each object's relative
//! key becomes a relative path, bytes written unchanged. No retries, no
//! integrity checks; any failure is fatal to startup.

use std::path::Path;

use anyhow::{bail, Context};
use graphserve::indexer::REQUIRED_ARTIFACTS;
use tracing::info;

use crate::settings::Settings;

/// Required artifacts missing from `dir`.
fn missing_artifacts(dir: &Path) -> Vec<&'static str> {
    REQUIRED_ARTIFACTS
        .iter()
        .copied()
        .filter(|name| !dir.join(name).exists())
        .collect()
}

/// Ensure all required artifact files exist locally, downloading from the
/// configured bucket when they do not.
pub async fn ensure_artifacts(settings: &Settings) -> anyhow::Result<()> {
    let missing = missing_artifacts(&settings.data_dir);
    if missing.is_empty() {
        info!(dir = %settings.data_dir.display(), "artifacts present");
        return Ok(());
    }

    let Some(bucket) = settings.artifact_bucket.as_deref() else {
        bail!(
            "artifacts missing from {} and no artifact bucket configured: {missing:?}",
            settings.data_dir.display()
        );
    };

    info!(bucket, ?missing, "downloading artifacts");
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = aws_sdk_s3::Client::new(&config);

    let mut pages = client
        .list_objects_v2()
        .bucket(bucket)
        .prefix(&settings.artifact_prefix)
        .into_paginator()
        .send();
    let mut downloaded = 0usize;
    while let Some(page) = pages.next().await {
        let page = page.context("listing artifact bucket")?;
        for object in page.contents() {
            let Some(key) = object.key() else { continue };
            if key.ends_with('/') {
                continue;
            }
            let relative = key
                .strip_prefix(&settings.artifact_prefix)
                .unwrap_or(key)
                .trim_start_matches('/');
            let target = settings.data_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let body = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .with_context(|| format!("fetching s3://{bucket}/{key}"))?
                .body
                .collect()
                .await
                .with_context(|| format!("reading s3://{bucket}/{key}"))?
                .into_bytes();
            tokio::fs::write(&target, &body)
                .await
                .with_context(|| format!("writing {}", target.display()))?;
            downloaded += 1;
            info!(key, target = %target.display(), "artifact downloaded");
        }
    }

    let still_missing = missing_artifacts(&settings.data_dir);
    if !still_missing.is_empty() {
        bail!("bucket {bucket} did not provide required artifacts: {still_missing:?}");
    }
    info!(downloaded, "artifact provisioning complete");
    Ok(())
}
