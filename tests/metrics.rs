use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use deepchat::{
    application::{
        chat::{
            CannedPool, ChatService, Pacing, ReplyMode, UpstreamClient, UpstreamDefaults,
            UpstreamError, UpstreamRequest, UpstreamStream,
        },
        render::{RenderMode, RenderService, render_service},
    },
    domain::chat::ChatPrompt,
    infra::telemetry,
};
use futures::StreamExt;
use metrics_util::debugging::DebuggingRecorder;

struct RefusingUpstream;

#[async_trait]
impl UpstreamClient for RefusingUpstream {
    async fn open(&self, _request: &UpstreamRequest) -> Result<UpstreamStream, UpstreamError> {
        Err(UpstreamError::Request("connection refused".to_string()))
    }
}

#[tokio::test]
async fn render_and_reply_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let renderer = render_service();
    renderer.render(RenderMode::Document, "# heading");
    renderer.render(RenderMode::Segmented, "text\n{\"a\": 1}");

    let upstream: Arc<dyn UpstreamClient> = Arc::new(RefusingUpstream);
    let chat = ChatService::new(
        ReplyMode::Dummy,
        CannedPool::default(),
        Pacing {
            interval: Duration::ZERO,
            chunk_chars: 8,
        },
        Some(upstream),
        UpstreamDefaults {
            model: "test-model".to_string(),
            temperature: 0.7,
        },
    );

    let local: Vec<_> = chat
        .reply(&ChatPrompt::new(Some("hello".to_string()), None))
        .collect()
        .await;
    assert!(!local.is_empty());

    let relayed: Vec<_> = chat
        .proxy("hello".to_string(), None, None)
        .expect("upstream configured")
        .collect()
        .await;
    assert_eq!(relayed.len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "deepchat_render_total",
        "deepchat_reply_total",
        "deepchat_upstream_stream_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
