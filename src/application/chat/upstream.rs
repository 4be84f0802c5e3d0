//! Pass-through relay of an upstream language-model stream.

use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream::BoxStream};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::reply::ReplyKind;

/// Marker appended after the last upstream chunk on normal completion.
pub const COMPLETION_SENTINEL: &str = "[DONE]";

/// Prefix for error text relayed to the client.
pub const ERROR_PREFIX: &str = "Error: ";

/// Payload forwarded to the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub message: String,
    pub model: String,
    pub temperature: f64,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream stream interrupted: {0}")]
    Stream(String),
}

pub type UpstreamStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// Client for the upstream streaming endpoint.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn open(&self, request: &UpstreamRequest) -> Result<UpstreamStream, UpstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl RelayOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RelayOutcome::Completed => "completed",
            RelayOutcome::Failed => "failed",
            RelayOutcome::Cancelled => "cancelled",
        }
    }
}

/// Records how a relay ended. A relay dropped before it finished was torn
/// down by the client.
struct RelayGuard {
    outcome: RelayOutcome,
    chunks: usize,
}

impl RelayGuard {
    fn new() -> Self {
        Self {
            outcome: RelayOutcome::Cancelled,
            chunks: 0,
        }
    }

    fn finish(&mut self, outcome: RelayOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        counter!("deepchat_upstream_stream_total", "outcome" => self.outcome.as_str())
            .increment(1);
        match self.outcome {
            RelayOutcome::Cancelled => info!(
                target = "deepchat::chat::upstream",
                chunks = self.chunks,
                "client disconnected; upstream stream released"
            ),
            outcome => debug!(
                target = "deepchat::chat::upstream",
                chunks = self.chunks,
                outcome = outcome.as_str(),
                "upstream relay finished"
            ),
        }
    }
}

fn error_chunk(error: &UpstreamError) -> Bytes {
    Bytes::from(format!("{ERROR_PREFIX}{error}"))
}

/// Relay the upstream stream for `request` chunk by chunk.
///
/// Normal completion appends [`COMPLETION_SENTINEL`]. Failures, whether while
/// connecting or mid-stream, emit one [`ERROR_PREFIX`]ed chunk and end the
/// stream. The upstream stream lives inside the returned stream, so dropping
/// it releases the upstream connection.
pub fn relay(
    client: Arc<dyn UpstreamClient>,
    request: UpstreamRequest,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream! {
        ReplyKind::Proxied.record();
        let mut guard = RelayGuard::new();

        let mut upstream = match client.open(&request).await {
            Ok(upstream) => upstream,
            Err(err) => {
                warn!(
                    target = "deepchat::chat::upstream",
                    error = %err,
                    model = %request.model,
                    "failed to open upstream stream"
                );
                guard.finish(RelayOutcome::Failed);
                yield Ok(error_chunk(&err));
                return;
            }
        };

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    guard.chunks += 1;
                    yield Ok(bytes);
                }
                Err(err) => {
                    warn!(
                        target = "deepchat::chat::upstream",
                        error = %err,
                        chunks = guard.chunks,
                        "upstream stream failed"
                    );
                    guard.finish(RelayOutcome::Failed);
                    yield Ok(error_chunk(&err));
                    return;
                }
            }
        }

        guard.finish(RelayOutcome::Completed);
        yield Ok(Bytes::from_static(COMPLETION_SENTINEL.as_bytes()));
    }
}
