//! OpenAI-compatible HTTP gateway over the graphserve query engines.
//!
//! The server exposes two routes:
//!
//! - `POST /v1/chat/completions` — routes the request to the global or
//!   local engine by model name and returns either one completion object
//!   or a server-sent-event stream of chunks.
//! - `GET /v1/models` — lists the two supported model identifiers.
//!
//! Engines are constructed once at startup (a strict barrier: any failure
//! aborts the process) and are shared, read-only, across all in-flight
//! requests through [`app::AppState`].

pub mod app;
pub mod error;
pub mod format;
pub mod handlers;
pub mod provision;
pub mod schema;
pub mod settings;
pub mod setup;

pub use app::{build_router, AppState, Engines};
pub use error::ServeError;
pub use settings::Settings;
