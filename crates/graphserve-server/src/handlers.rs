//! Request handlers for the chat-completion and model-listing routes.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ServeError;
use crate::format::format_response;
use crate::schema::{
    ChatCompletionRequest, ChatCompletionResponse, ModelList, StreamChunk, Usage,
};
use crate::settings::MODEL_GLOBAL_SEARCH;

/// Artificial gap between streamed line events. The engines return a
/// complete answer before streaming starts; this only emulates
/// progressive delivery.
const STREAM_CHUNK_DELAY: Duration = Duration::from_millis(50);

/// `POST /v1/chat/completions`
///
/// The global alias routes to the global engine by exact match; any other
/// model name falls back to the local engine (deliberately not rejected).
#[instrument(skip(state, request), fields(model = %request.model, stream = request.stream))]
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ServeError> {
    let engines = state.engines.as_ref().ok_or(ServeError::EngineNotReady)?;
    let prompt = request
        .messages
        .last()
        .ok_or_else(|| ServeError::InvalidRequest("messages must not be empty".to_string()))?
        .content
        .clone();

    info!("processing chat completion");
    let result = if request.model == MODEL_GLOBAL_SEARCH {
        engines.global.asearch(&prompt).await?
    } else {
        engines.local.asearch(&prompt).await?
    };
    let formatted = format_response(&result.response);

    if request.stream {
        Ok(stream_completion(request.model, formatted).into_response())
    } else {
        let usage = Usage::from_texts(&prompt, &formatted);
        let response = ChatCompletionResponse::new(
            completion_id(),
            request.model,
            formatted,
            usage,
        );
        Ok(Json(response).into_response())
    }
}

/// `GET /v1/models`
///
/// Static listing of the two supported identifiers; never fails.
pub async fn list_models() -> Json<ModelList> {
    Json(ModelList::current())
}

fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Emit the formatted answer as SSE: one event per line (line plus a
/// trailing newline as the delta), a terminal empty-delta event with
/// finish reason `stop`, then the `[DONE]` sentinel. Every event shares
/// one completion id.
fn stream_completion(
    model: String,
    formatted: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = completion_id();
    let stream = async_stream::stream! {
        for line in formatted.split('\n') {
            let chunk = StreamChunk::content(&id, &model, format!("{line}\n"));
            if let Ok(event) = Event::default().json_data(&chunk) {
                yield Ok(event);
            }
            tokio::time::sleep(STREAM_CHUNK_DELAY).await;
        }
        let last = StreamChunk::done(&id, &model);
        if let Ok(event) = Event::default().json_data(&last) {
            yield Ok(event);
        }
        yield Ok(Event::default().data("[DONE]"));
    };
    Sse::new(stream)
}
