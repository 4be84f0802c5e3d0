use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const TARGET: &str = "deepchat::http::response";

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Which part of the server a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `/grok`: paced plain-text reply.
    Reply,
    /// `/grok/live`: server-sent render events.
    LiveReply,
    /// `/chat/stream`: upstream relay.
    Relay,
    Render,
    Asset,
    Health,
    Unknown,
}

impl RouteKind {
    pub fn classify(path: &str) -> Self {
        match path {
            "/grok" => Self::Reply,
            "/grok/live" => Self::LiveReply,
            "/chat/stream" => Self::Relay,
            "/convert-markdown" | "/process-text" => Self::Render,
            "/_health" => Self::Health,
            "/" => Self::Asset,
            other if other.starts_with("/static/") => Self::Asset,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::LiveReply => "live_reply",
            Self::Relay => "relay",
            Self::Render => "render",
            Self::Asset => "asset",
            Self::Health => "health",
            Self::Unknown => "unknown",
        }
    }

    /// Routes whose body is produced after the handler returns.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Reply | Self::LiveReply | Self::Relay)
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub route: RouteKind,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        route: RouteKind::classify(request.uri().path()),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let (request_id, route) = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| (ctx.request_id.clone(), ctx.route))
        .unwrap_or_else(|| (String::new(), RouteKind::classify(&path)));

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if !status.is_client_error() && !status.is_server_error() {
        if route.is_streaming() {
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("");
            debug!(
                target = TARGET,
                status = status.as_u16(),
                route = route.as_str(),
                content_type = content_type,
                elapsed_ms = elapsed_ms,
                request_id = request_id,
                "reply stream opened",
            );
        }
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            route = route.as_str(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "request failed",
        );
    } else {
        warn!(
            target = TARGET,
            status = status.as_u16(),
            method = %method,
            path = %path,
            route = route.as_str(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "client request error",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_server_routes() {
        assert_eq!(RouteKind::classify("/grok"), RouteKind::Reply);
        assert_eq!(RouteKind::classify("/grok/live"), RouteKind::LiveReply);
        assert_eq!(RouteKind::classify("/chat/stream"), RouteKind::Relay);
        assert_eq!(RouteKind::classify("/convert-markdown"), RouteKind::Render);
        assert_eq!(RouteKind::classify("/process-text"), RouteKind::Render);
        assert_eq!(RouteKind::classify("/"), RouteKind::Asset);
        assert_eq!(RouteKind::classify("/static/app.js"), RouteKind::Asset);
        assert_eq!(RouteKind::classify("/_health"), RouteKind::Health);
        assert_eq!(RouteKind::classify("/grok/extra"), RouteKind::Unknown);
    }

    #[test]
    fn only_reply_routes_stream() {
        assert!(RouteKind::Reply.is_streaming());
        assert!(RouteKind::LiveReply.is_streaming());
        assert!(RouteKind::Relay.is_streaming());
        assert!(!RouteKind::Render.is_streaming());
        assert!(!RouteKind::Asset.is_streaming());
    }
}
