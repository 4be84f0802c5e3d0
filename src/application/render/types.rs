use serde::{Deserialize, Serialize};

/// Selects how JSON embedded in a text blob is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Treat the entire input as one unit: either one JSON document or one
    /// Markdown document.
    Document,
    /// Partition the input line by line into Markdown spans and JSON blocks.
    Segmented,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Document => "document",
            RenderMode::Segmented => "segmented",
        }
    }
}

/// Result of a whole-document render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Rendered markup, safe to insert into the page.
    pub html: String,
    /// The untouched input, kept for copy-to-clipboard.
    pub raw: String,
    /// True only when the entire input parsed as one JSON document.
    pub is_json: bool,
    /// True when the input is JSON, contains a code fence, or contains a pipe.
    pub has_code_or_table: bool,
}

/// Result of a line-segmented render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedRender {
    pub html: String,
    pub raw: String,
}

impl From<RenderResult> for SegmentedRender {
    fn from(result: RenderResult) -> Self {
        Self {
            html: result.html,
            raw: result.raw,
        }
    }
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: the same text always yields the same markup. Rendering never
/// fails; malformed JSON falls back to Markdown.
pub trait RenderService: Send + Sync {
    fn render_document(&self, text: &str) -> RenderResult;

    fn render_segmented(&self, text: &str) -> SegmentedRender;

    /// Render under the requested mode, widening segmented output to a full
    /// [`RenderResult`] so streaming callers can handle both modes uniformly.
    fn render(&self, mode: RenderMode, text: &str) -> RenderResult {
        match mode {
            RenderMode::Document => self.render_document(text),
            RenderMode::Segmented => {
                let SegmentedRender { html, raw } = self.render_segmented(text);
                let has_code_or_table = contains_code_or_table(&raw);
                RenderResult {
                    html,
                    raw,
                    is_json: false,
                    has_code_or_table,
                }
            }
        }
    }
}

/// Heuristic for content that benefits from a copy affordance: a fenced code
/// marker or a table pipe.
pub fn contains_code_or_table(text: &str) -> bool {
    text.contains("```") || text.contains('|')
}
