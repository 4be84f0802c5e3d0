//! Server-side incremental rendering of a reply stream.

use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use axum::response::sse::Event;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::warn;

use crate::application::render::{RenderMode, RenderResult, RenderService};

use super::upstream::COMPLETION_SENTINEL;

/// Accumulates raw reply bytes, holding back any incomplete UTF-8 sequence at
/// the end until the next chunk completes it.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    text: String,
    pending: Vec<u8>,
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns true when new text became available.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        self.pending.extend_from_slice(chunk);
        let before = self.text.len();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    let prefix = String::from_utf8_lossy(&self.pending[..valid_up_to]);
                    self.text.push_str(&prefix);
                    match err.error_len() {
                        // Incomplete trailing sequence: wait for more bytes.
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                        Some(invalid) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                    }
                }
            }
        }

        self.text.len() != before
    }

    /// The accumulated text with a trailing completion marker removed.
    pub fn visible_text(&self) -> &str {
        self.text
            .strip_suffix(COMPLETION_SENTINEL)
            .unwrap_or(&self.text)
    }
}

fn render_event(result: &RenderResult) -> Option<Event> {
    match serde_json::to_string(result) {
        Ok(payload) => Some(Event::default().event("render").data(payload)),
        Err(err) => {
            warn!(
                target = "deepchat::chat::live",
                error = %err,
                "failed to encode render event"
            );
            None
        }
    }
}

/// One step of a live render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    Render(RenderResult),
    Done,
}

/// Re-render the whole accumulated reply after every increment.
///
/// Each result replaces the previous one wholesale; nothing is appended.
/// [`LiveUpdate::Done`] follows the last chunk.
pub fn live_updates<S, R>(
    source: S,
    renderer: Arc<R>,
    mode: RenderMode,
) -> impl Stream<Item = LiveUpdate> + Send + 'static
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
    R: RenderService + ?Sized + 'static,
{
    stream! {
        let mut source = Box::pin(source);
        let mut accumulator = ReplyAccumulator::new();

        while let Some(chunk) = source.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(never) => match never {},
            };
            if !accumulator.push(&bytes) {
                continue;
            }
            yield LiveUpdate::Render(renderer.render(mode, accumulator.visible_text()));
        }

        yield LiveUpdate::Done;
    }
}

/// [`live_updates`] as server-sent `render` and `done` events.
pub fn live_render<S, R>(
    source: S,
    renderer: Arc<R>,
    mode: RenderMode,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
    R: RenderService + ?Sized + 'static,
{
    live_updates(source, renderer, mode).filter_map(|update| async move {
        match update {
            LiveUpdate::Render(result) => render_event(&result).map(Ok),
            LiveUpdate::Done => Some(Ok(Event::default().event("done").data(""))),
        }
    })
}
