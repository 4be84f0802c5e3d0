use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response, Sse, sse::KeepAlive},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    application::{
        chat::{ReplyStream, live_render},
        error::HttpError,
        render::RenderMode,
    },
    domain::chat::ChatPrompt,
};

use super::{HttpState, multipart::read_chat_prompt};

const SOURCE_BASE: &str = "infra::http::chat";
const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Deserialize)]
pub(super) struct ChatStreamRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
}

/// `POST /grok`: stream the reply as chunked plain text.
pub(super) async fn grok(State(state): State<HttpState>, mut multipart: Multipart) -> Response {
    let prompt = match read_prompt(&state, &mut multipart).await {
        Ok(prompt) => prompt,
        Err(err) => return err.into_response(),
    };

    streaming_response(state.chat.reply(&prompt), TEXT_PLAIN_UTF8)
}

/// `POST /grok/live`: stream the reply as server-sent render events.
pub(super) async fn grok_live(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Response {
    let prompt = match read_prompt(&state, &mut multipart).await {
        Ok(prompt) => prompt,
        Err(err) => return err.into_response(),
    };

    let events = live_render(
        state.chat.reply(&prompt),
        Arc::clone(&state.render),
        RenderMode::Document,
    );
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// `POST /chat/stream`: relay a message to the upstream service.
pub(super) async fn chat_stream(
    State(state): State<HttpState>,
    Json(request): Json<ChatStreamRequest>,
) -> Response {
    let ChatStreamRequest {
        message,
        model,
        temperature,
    } = request;

    let Some(message) = message.filter(|value| !value.trim().is_empty()) else {
        return HttpError::new(
            SOURCE_BASE,
            StatusCode::BAD_REQUEST,
            "Request could not be processed",
            "`message` is required",
        )
        .into_response();
    };

    match state.chat.proxy(message, model, temperature) {
        Some(stream) => streaming_response(stream, EVENT_STREAM),
        None => {
            warn!(target = SOURCE_BASE, "chat stream requested without upstream");
            HttpError::new(
                SOURCE_BASE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Upstream is not configured",
                "no upstream client available",
            )
            .into_response()
        }
    }
}

async fn read_prompt(
    state: &HttpState,
    multipart: &mut Multipart,
) -> Result<ChatPrompt, HttpError> {
    let prompt = read_chat_prompt(multipart, &state.uploads)
        .await
        .map_err(|err| err.into_http(state.upload_limit_bytes))?;

    debug!(
        target = SOURCE_BASE,
        has_message = prompt.message().is_some(),
        has_file = prompt.file().is_some(),
        "chat prompt received"
    );

    Ok(prompt)
}

fn streaming_response(stream: ReplyStream, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
