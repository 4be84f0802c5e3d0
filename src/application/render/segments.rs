//! Line-oriented segmentation of mixed Markdown/JSON text.

use serde_json::Value;

use super::parse::parse_json;

/// A classified run of input lines, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text to be rendered as Markdown in isolation. Either a single trimmed
    /// line or the raw accumulation of a JSON candidate that never closed.
    Markdown { text: String },
    /// A run of lines whose newline-joined trimmed text parsed as JSON.
    Json { value: Value },
}

/// Split `text` into segments.
///
/// A trimmed line opening with `{` or `[` starts a JSON candidate. Lines are
/// appended to the candidate until one ends with `}` or `]` and the whole
/// accumulation parses; anything else keeps accumulating. Blank lines outside
/// a candidate are dropped.
pub fn segment_text(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.split('\n') {
        let trimmed = line.trim();

        match pending.as_mut() {
            Some(buffer) => {
                buffer.push('\n');
                buffer.push_str(trimmed);
            }
            None if opens_json(trimmed) => pending = Some(trimmed.to_string()),
            None => {
                if !trimmed.is_empty() {
                    segments.push(Segment::Markdown {
                        text: trimmed.to_string(),
                    });
                }
                continue;
            }
        }

        if !closes_json(trimmed) {
            continue;
        }

        let parsed = pending
            .as_deref()
            .and_then(parse_json);
        if let Some(value) = parsed {
            segments.push(Segment::Json { value });
            pending = None;
        }
    }

    if let Some(text) = pending {
        segments.push(Segment::Markdown { text });
    }

    segments
}

fn opens_json(trimmed: &str) -> bool {
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn closes_json(trimmed: &str) -> bool {
    trimmed.ends_with('}') || trimmed.ends_with(']')
}
