mod chat;
mod middleware;
mod multipart;
mod render;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::{
    application::{chat::ChatService, render::ComrakRenderService},
    infra::{assets, uploads::UploadStorage},
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub render: Arc<ComrakRenderService>,
    pub chat: Arc<ChatService>,
    pub uploads: Arc<UploadStorage>,
    pub upload_limit_bytes: u64,
}

pub fn build_router(state: HttpState) -> Router {
    let body_limit = usize::try_from(state.upload_limit_bytes).unwrap_or(usize::MAX);

    let chat_routes = Router::new()
        .route("/grok", post(chat::grok))
        .route("/grok/live", post(chat::grok_live))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/", get(assets::serve_index))
        .route("/static/{*path}", get(assets::serve_frontend))
        .route("/_health", get(health))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/convert-markdown", post(render::convert_markdown))
        .route("/process-text", post(render::process_text))
        .merge(chat_routes)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
