//! Embedded frontend asset serving.

use std::borrow::Cow;

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::{Mime, MimeGuess};

use crate::application::error::ErrorReport;

static FRONTEND_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

const INDEX_FILE: &str = "index.html";

/// Serve the chat page.
pub async fn serve_index() -> Response {
    serve_static(Some(INDEX_FILE.to_string()), "infra::assets::serve_index", false)
}

/// Serve embedded frontend assets.
pub async fn serve_frontend(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value);
    serve_static(captured, "infra::assets::serve_frontend", true)
}

fn serve_static(path: Option<String>, source: &'static str, immutable: bool) -> Response {
    match resolve_asset(&FRONTEND_ASSETS, path) {
        Some(asset) => asset.into_http_response(immutable),
        None => not_found_response(source),
    }
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

struct Asset<'a> {
    contents: Cow<'a, [u8]>,
    mime: MimeGuess,
}

fn resolve_asset(bundle: &'static Dir<'static>, path: Option<String>) -> Option<Asset<'static>> {
    let mut candidate = path.unwrap_or_default();
    if candidate.starts_with('/') {
        candidate = candidate.trim_start_matches('/').to_string();
    }

    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = bundle.get_file(&candidate)?;
    let mime = mime_guess::from_path(&candidate);
    Some(Asset {
        contents: Cow::Borrowed(file.contents()),
        mime,
    })
}

impl Asset<'static> {
    fn into_http_response(self, immutable: bool) -> Response {
        let mime = self.mime.first_or_octet_stream();
        let bytes = match self.contents {
            Cow::Borrowed(slice) => Bytes::from_static(slice),
            Cow::Owned(bytes) => Bytes::from(bytes),
        };
        build_response(bytes, mime, immutable)
    }
}

fn build_response(bytes: Bytes, mime: Mime, immutable: bool) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    let cache_control = if immutable {
        "public, max-age=3600"
    } else {
        "no-cache"
    };
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));

    response
}
