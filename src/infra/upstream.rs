//! HTTP client for the upstream streaming language-model service.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Url};
use tracing::debug;

use crate::application::chat::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamStream};

use super::error::InfraError;

/// Longest error body quoted back to the client.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// `reqwest`-backed [`UpstreamClient`] posting JSON and streaming the body.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: Client,
    url: Url,
}

impl HttpUpstreamClient {
    pub fn new(url: Url, connect_timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build upstream client: {err}"))
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn open(&self, request: &UpstreamRequest) -> Result<UpstreamStream, UpstreamError> {
        debug!(
            target = "deepchat::infra::upstream",
            url = %self.url,
            model = %request.model,
            "opening upstream stream"
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(|err| UpstreamError::Stream(err.to_string()))
            .boxed())
    }
}
