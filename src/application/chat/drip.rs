//! Timer-paced delivery of a finished reply.

use std::{convert::Infallible, time::Duration};

use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use metrics::counter;
use tracing::debug;

/// How a reply is metered out to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Delay before each unit. Zero disables pacing.
    pub interval: Duration,
    /// Characters per unit. Always at least one.
    pub chunk_chars: usize,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            chunk_chars: 1,
        }
    }
}

/// Split `text` into units of `chunk_chars` characters without breaking UTF-8
/// sequences.
pub fn units(text: &str, chunk_chars: usize) -> Vec<&str> {
    let size = chunk_chars.max(1);
    let mut units = Vec::new();
    let mut start = 0;
    let mut taken = 0;

    for (offset, _) in text.char_indices() {
        if taken == size {
            units.push(&text[start..offset]);
            start = offset;
            taken = 0;
        }
        taken += 1;
    }
    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

/// Emit `text` one unit at a time.
///
/// The returned stream owns the schedule: once the response body holding it
/// is dropped, no further units are produced.
pub fn drip(
    text: String,
    pacing: Pacing,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream! {
        let owned: Vec<String> = units(&text, pacing.chunk_chars)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut guard = DeliveryGuard::new(owned.len());

        for unit in owned {
            if !pacing.interval.is_zero() {
                tokio::time::sleep(pacing.interval).await;
            }
            guard.delivered += 1;
            yield Ok(Bytes::from(unit));
        }
    }
}

struct DeliveryGuard {
    total: usize,
    delivered: usize,
}

impl DeliveryGuard {
    fn new(total: usize) -> Self {
        Self {
            total,
            delivered: 0,
        }
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if self.delivered < self.total {
            counter!("deepchat_drip_interrupted_total").increment(1);
            debug!(
                target = "deepchat::chat::drip",
                delivered = self.delivered,
                total = self.total,
                "client went away before the reply finished; delivery stopped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use tokio::time::Instant;

    use super::*;

    async fn collect(stream: impl Stream<Item = Result<Bytes, Infallible>>) -> Vec<String> {
        stream
            .map(|chunk| match chunk {
                Ok(bytes) => String::from_utf8(bytes.to_vec()).expect("utf-8 chunk"),
                Err(never) => match never {},
            })
            .collect()
            .await
    }

    #[test]
    fn units_respect_char_boundaries() {
        assert_eq!(units("héllo", 2), vec!["hé", "ll", "o"]);
        assert_eq!(units("日本語", 1), vec!["日", "本", "語"]);
        assert!(units("", 3).is_empty());
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        assert_eq!(units("ab", 0), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_every_character_in_order() {
        let pacing = Pacing {
            interval: Duration::from_millis(5),
            chunk_chars: 1,
        };
        let chunks = collect(drip("Hi **there**".to_string(), pacing)).await;

        assert_eq!(chunks.len(), "Hi **there**".chars().count());
        assert_eq!(chunks.concat(), "Hi **there**");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_one_interval_per_unit() {
        let pacing = Pacing {
            interval: Duration::from_millis(50),
            chunk_chars: 2,
        };
        let started = Instant::now();
        let chunks = collect(drip("abcdef".to_string(), pacing)).await;

        assert_eq!(chunks, vec!["ab", "cd", "ef"]);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    fn interrupted_count(snapshotter: &Snapshotter) -> Option<u64> {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count)
                    if key.key().name() == "deepchat_drip_interrupted_total" =>
                {
                    Some(count)
                }
                _ => None,
            })
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_stops_delivery() {
        let pacing = Pacing {
            interval: Duration::from_millis(10),
            chunk_chars: 1,
        };
        let mut stream = Box::pin(drip("abcdef".to_string(), pacing));

        let first = stream.next().await;
        assert!(matches!(first, Some(Ok(ref bytes)) if bytes.as_ref() == b"a"));

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, || drop(stream));
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(interrupted_count(&snapshotter), Some(1));
    }

    #[test]
    fn finished_delivery_is_not_counted_as_interrupted() {
        let pacing = Pacing {
            interval: Duration::ZERO,
            chunk_chars: 2,
        };
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        let chunks = metrics::with_local_recorder(&recorder, || {
            futures::executor::block_on(collect(drip("abcdef".to_string(), pacing)))
        });

        assert_eq!(chunks, vec!["ab", "cd", "ef"]);
        assert_eq!(interrupted_count(&snapshotter), None);
    }

    #[tokio::test]
    async fn zero_interval_does_not_sleep() {
        let pacing = Pacing {
            interval: Duration::ZERO,
            chunk_chars: 4,
        };
        let chunks = collect(drip("abcdefg".to_string(), pacing)).await;
        assert_eq!(chunks, vec!["abcd", "efg"]);
    }
}
