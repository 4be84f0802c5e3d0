//! Chat response source: picks, paces, or proxies the assistant reply.

mod drip;
mod live;
mod reply;
mod upstream;

use std::{convert::Infallible, pin::Pin, sync::Arc};

use bytes::Bytes;
use futures::Stream;
use rand::thread_rng;

pub use drip::{Pacing, drip, units};
pub use live::{LiveUpdate, ReplyAccumulator, live_render, live_updates};
pub use reply::{
    CannedPool, EMPTY_PROMPT_REPLY, Reply, ReplyKind, file_ack, select_reply,
};
pub use upstream::{
    COMPLETION_SENTINEL, ERROR_PREFIX, UpstreamClient, UpstreamError, UpstreamRequest,
    UpstreamStream, relay,
};

use crate::domain::chat::ChatPrompt;

/// Where replies to messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Canned replies dripped from the local pool.
    Dummy,
    /// Messages are forwarded to the upstream service.
    Proxy,
}

/// Model parameters forwarded with each proxied message.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamDefaults {
    pub model: String,
    pub temperature: f64,
}

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// Produces the reply body for a chat submission.
pub struct ChatService {
    mode: ReplyMode,
    pool: CannedPool,
    pacing: Pacing,
    upstream: Option<Arc<dyn UpstreamClient>>,
    defaults: UpstreamDefaults,
}

impl ChatService {
    pub fn new(
        mode: ReplyMode,
        pool: CannedPool,
        pacing: Pacing,
        upstream: Option<Arc<dyn UpstreamClient>>,
        defaults: UpstreamDefaults,
    ) -> Self {
        Self {
            mode,
            pool,
            pacing,
            upstream,
            defaults,
        }
    }

    pub fn mode(&self) -> ReplyMode {
        self.mode
    }

    /// Build the reply stream for `prompt`.
    ///
    /// In proxy mode a message without a file is relayed upstream; uploads and
    /// empty prompts are always answered locally.
    pub fn reply(&self, prompt: &ChatPrompt) -> ReplyStream {
        if let (ReplyMode::Proxy, Some(upstream), Some(message), None) = (
            self.mode,
            self.upstream.as_ref(),
            prompt.message(),
            prompt.file(),
        ) {
            return Box::pin(relay(
                Arc::clone(upstream),
                self.upstream_request(message.to_string(), None, None),
            ));
        }

        let reply = select_reply(prompt, &self.pool, &mut thread_rng());
        Box::pin(drip(reply.text, self.pacing))
    }

    /// Relay `message` upstream with optional per-request overrides.
    ///
    /// Returns `None` when no upstream is configured.
    pub fn proxy(
        &self,
        message: String,
        model: Option<String>,
        temperature: Option<f64>,
    ) -> Option<ReplyStream> {
        let upstream = self.upstream.as_ref()?;
        let request = self.upstream_request(message, model, temperature);
        Some(Box::pin(relay(Arc::clone(upstream), request)))
    }

    fn upstream_request(
        &self,
        message: String,
        model: Option<String>,
        temperature: Option<f64>,
    ) -> UpstreamRequest {
        UpstreamRequest {
            message,
            model: model.unwrap_or_else(|| self.defaults.model.clone()),
            temperature: temperature.unwrap_or(self.defaults.temperature),
        }
    }
}
