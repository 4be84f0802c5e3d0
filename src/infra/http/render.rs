use axum::{Json, extract::State};
use serde::Deserialize;

use crate::{
    application::{
        error::AppError,
        render::{RenderMode, RenderResult, RenderService, SegmentedRender},
    },
    domain::chat::RenderText,
};

use super::HttpState;

#[derive(Debug, Deserialize)]
pub(super) struct RenderRequest {
    #[serde(default)]
    text: Option<String>,
}

/// `POST /convert-markdown`: whole-document render.
pub(super) async fn convert_markdown(
    State(state): State<HttpState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResult>, AppError> {
    let text = RenderText::parse(request.text)?;
    Ok(Json(state.render.render(RenderMode::Document, text.as_str())))
}

/// `POST /process-text`: line-segmented render.
pub(super) async fn process_text(
    State(state): State<HttpState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<SegmentedRender>, AppError> {
    let text = RenderText::parse(request.text)?;
    Ok(Json(state.render.render_segmented(text.as_str())))
}
