//! Server binary: provision artifacts, build engines, serve.

use graphserve_server::{build_router, provision, setup, AppState, Settings};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let settings = Settings::from_env();
    info!(
        data_dir = %settings.data_dir.display(),
        port = settings.port,
        "starting graphserve-server"
    );

    provision::ensure_artifacts(&settings).await?;
    let engines = setup::build_engines(&settings).await?;
    let state = AppState::with_engines(engines);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
