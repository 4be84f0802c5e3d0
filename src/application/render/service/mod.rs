mod config;
mod json;

use std::sync::Arc;

use comrak::markdown_to_html;
use metrics::counter;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::application::render::parse::parse_json;
use crate::application::render::segments::{Segment, segment_text};
use crate::application::render::types::{
    RenderMode, RenderResult, RenderService, SegmentedRender, contains_code_or_table,
};

use config::{build_sanitizer, default_options};

/// Comrak-based Markdown renderer with Ammonia sanitisation and JSON block
/// detection.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }

    /// Render a Markdown fragment and sanitise the resulting markup.
    pub fn render_markdown(&self, markdown: &str) -> String {
        let html = markdown_to_html(markdown, &self.options);
        self.sanitizer.clean(&html).to_string()
    }

    /// Render pre-computed segments in order. Each segment is followed by a
    /// newline.
    pub fn render_segments(&self, segments: &[Segment]) -> String {
        let mut html = String::new();
        for segment in segments {
            match segment {
                Segment::Markdown { text } => html.push_str(&self.render_markdown(text)),
                Segment::Json { value } => html.push_str(&json::segment_block(value)),
            }
            html.push('\n');
        }
        html
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render_document(&self, text: &str) -> RenderResult {
        counter!("deepchat_render_total", "mode" => RenderMode::Document.as_str()).increment(1);

        if let Some(value) = parse_json(text) {
            trace!(target = "deepchat::render", "input parsed as a JSON document");
            return RenderResult {
                html: json::document_block(&value),
                raw: text.to_string(),
                is_json: true,
                has_code_or_table: true,
            };
        }

        RenderResult {
            html: self.render_markdown(text),
            raw: text.to_string(),
            is_json: false,
            has_code_or_table: contains_code_or_table(text),
        }
    }

    fn render_segmented(&self, text: &str) -> SegmentedRender {
        counter!("deepchat_render_total", "mode" => RenderMode::Segmented.as_str()).increment(1);

        let segments = segment_text(text);
        trace!(
            target = "deepchat::render",
            segments = segments.len(),
            "segmented input"
        );

        SegmentedRender {
            html: self.render_segments(&segments),
            raw: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Arc<ComrakRenderService> {
        render_service()
    }

    #[test]
    fn document_json_is_pretty_printed() {
        let result = renderer().render_document(r#"{"status":"ok","items":[1,2]}"#);

        assert!(result.is_json);
        assert!(result.has_code_or_table);
        assert_eq!(
            result.html,
            "<pre>{\n  &quot;status&quot;: &quot;ok&quot;,\n  &quot;items&quot;: [\n    1,\n    2\n  ]\n}</pre>"
        );
    }

    #[test]
    fn document_scalars_count_as_json() {
        let result = renderer().render_document("42");
        assert!(result.is_json);
        assert_eq!(result.html, "<pre>42</pre>");
    }

    #[test]
    fn document_accepts_deeply_nested_json() {
        let text = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let result = renderer().render_document(&text);

        assert!(result.is_json);
        assert!(result.html.starts_with("<pre>[\n  [\n    ["));
        assert!(result.html.ends_with("]</pre>"));
    }

    #[test]
    fn document_keeps_out_of_range_numbers() {
        let result = renderer().render_document("1e400");
        assert!(result.is_json);
        assert_eq!(result.html, "<pre>1e400</pre>");
    }

    #[test]
    fn document_markdown_matches_fragment_rendering() {
        let text = "# Title\n\nSome *emphasis* and `code`.";
        let service = renderer();
        let result = service.render_document(text);

        assert!(!result.is_json);
        assert!(!result.has_code_or_table);
        assert_eq!(result.html, service.render_markdown(text));
        assert!(result.html.contains("<h1>Title</h1>"));
        assert!(result.html.contains("<em>emphasis</em>"));
        assert!(result.html.contains("<code>code</code>"));
    }

    #[test]
    fn document_flags_code_fences_and_tables() {
        let service = renderer();
        assert!(service.render_document("```\nx\n```").has_code_or_table);
        assert!(service.render_document("| a | b |").has_code_or_table);
        assert!(!service.render_document("plain words").has_code_or_table);
    }

    #[test]
    fn document_tables_render() {
        let text = "| Name | Value |\n| --- | --- |\n| a | 1 |";
        let html = renderer().render_document(text).html;
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>a</td>"));
    }

    #[test]
    fn document_markdown_is_sanitised() {
        let html = renderer()
            .render_document("hello <img src=x onerror=alert(1)>")
            .html;
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn segmented_single_line_json_has_no_markdown() {
        let result = renderer().render_segmented(r#"{"a":1}"#);
        assert_eq!(
            result.html,
            "<pre><code>{\n  &quot;a&quot;: 1\n}</code></pre>\n"
        );
        assert_eq!(result.raw, r#"{"a":1}"#);
    }

    #[test]
    fn segmented_closes_deeply_nested_json() {
        let text = format!("intro\n{}1{}", "{\"a\":".repeat(200), "}".repeat(200));
        let html = renderer().render_segmented(&text).html;

        let intro = html.find("<p>intro</p>").expect("intro rendered");
        let block = html
            .find("<pre><code>{\n  &quot;a&quot;: {")
            .expect("json block rendered");
        assert!(intro < block);
        assert!(html.ends_with("}</code></pre>\n"));
        assert_eq!(html.matches("<p>").count(), 1);
    }

    #[test]
    fn segmented_mixes_markdown_and_json_in_order() {
        let text = "Hello **world**\n{\"x\": 1}\n";
        let html = renderer().render_segmented(text).html;

        let strong = html
            .find("<strong>world</strong>")
            .expect("emphasis rendered");
        let block = html
            .find("<pre><code>{\n  &quot;x&quot;: 1\n}</code></pre>")
            .expect("json block rendered");
        assert!(strong < block);
    }

    #[test]
    fn segmented_blank_lines_produce_nothing() {
        let service = renderer();
        let spaced = service.render_segmented("one\n\n\n  \ntwo").html;
        let tight = service.render_segmented("one\ntwo").html;
        assert_eq!(spaced, tight);
        assert!(tight.starts_with("<p>one</p>"));
        assert!(tight.trim_end().ends_with("<p>two</p>"));
    }

    #[test]
    fn segmented_unterminated_json_is_kept_as_markdown() {
        let html = renderer()
            .render_segmented("{\nnot json at all")
            .html;
        assert!(html.contains("not json at all"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn segmented_defers_until_document_is_complete() {
        let text = "{\n\"a\": [\n1]\n}";
        let html = renderer().render_segmented(text).html;
        assert_eq!(
            html,
            "<pre><code>{\n  &quot;a&quot;: [\n    1\n  ]\n}</code></pre>\n"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let text = "Intro\n[\n{\"k\": \"v\"}\n]\n| a | b |\n```rust\nfn main() {}\n```";
        let service = renderer();
        assert_eq!(service.render_segmented(text), service.render_segmented(text));
        assert_eq!(service.render_document(text), service.render_document(text));
    }

    #[test]
    fn render_widens_segmented_output() {
        let result = renderer().render(RenderMode::Segmented, "| a |");
        assert!(!result.is_json);
        assert!(result.has_code_or_table);
    }
}
