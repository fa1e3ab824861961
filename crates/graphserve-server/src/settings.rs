//! Configuration resolved from environment variables and fixed constants.

use std::env;
use std::path::PathBuf;

/// Model identifier that routes to the global engine.
pub const MODEL_GLOBAL_SEARCH: &str = "graphrag-global-search:latest";
/// Model identifier that routes to the local engine. Any model name other
/// than [`MODEL_GLOBAL_SEARCH`] also lands here.
pub const MODEL_LOCAL_SEARCH: &str = "graphrag-local-search:latest";
/// Ownership tag reported by the model listing.
pub const MODEL_OWNER: &str = "graphserve";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_DATA_DIR: &str = "./artifacts";
const DEFAULT_PORT: u16 = 8012;

/// Resolved server configuration.
///
/// The API key is carried as-is; a missing key is not an error here and
/// only surfaces when the model client is actually invoked.
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI API credential (`OPENAI_API_KEY`).
    pub api_key: String,
    /// OpenAI-compatible API base URL (`OPENAI_API_BASE`).
    pub api_base: String,
    /// Directory holding the index artifacts (`GRAPHSERVE_DATA_DIR`).
    pub data_dir: PathBuf,
    /// S3 bucket to fetch missing artifacts from
    /// (`GRAPHSERVE_ARTIFACT_BUCKET`); provisioning is skipped when unset.
    pub artifact_bucket: Option<String>,
    /// Key prefix inside the bucket (`GRAPHSERVE_ARTIFACT_PREFIX`).
    pub artifact_prefix: String,
    /// Listen port (`GRAPHSERVE_PORT`).
    pub port: u16,
}

impl Settings {
    /// Resolve settings from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            data_dir: env::var("GRAPHSERVE_DATA_DIR")
                .map_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            artifact_bucket: env::var("GRAPHSERVE_ARTIFACT_BUCKET").ok(),
            artifact_prefix: env::var("GRAPHSERVE_ARTIFACT_PREFIX").unwrap_or_default(),
            port: env::var("GRAPHSERVE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// Location of the LanceDB database under the data directory.
    #[must_use]
    pub fn lancedb_uri(&self) -> String {
        self.data_dir.join("lancedb").to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lancedb_uri_sits_under_data_dir() {
        let settings = Settings {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: PathBuf::from("/data/index"),
            artifact_bucket: None,
            artifact_prefix: String::new(),
            port: DEFAULT_PORT,
        };
        assert_eq!(settings.lancedb_uri(), "/data/index/lancedb");
    }
}
