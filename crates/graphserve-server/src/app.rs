//! Application state and router wiring.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use graphserve::SearchEngine;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// The two engines, built once behind the startup barrier.
pub struct Engines {
    pub local: Arc<dyn SearchEngine>,
    pub global: Arc<dyn SearchEngine>,
}

/// State shared across handlers.
///
/// `engines` is `None` only before startup completes; handlers answer 500
/// in that state instead of serving against a partially built index.
#[derive(Clone, Default)]
pub struct AppState {
    pub engines: Option<Arc<Engines>>,
}

impl AppState {
    #[must_use]
    pub fn with_engines(engines: Engines) -> Self {
        Self {
            engines: Some(Arc::new(engines)),
        }
    }
}

/// Build the two-route API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
