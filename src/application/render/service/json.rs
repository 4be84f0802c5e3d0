use serde_json::Value;

/// Pretty-print a parsed JSON value with two-space indentation and escape it
/// for insertion as element text.
pub(crate) fn pretty_escaped(value: &Value) -> String {
    // Serialising a `Value` cannot fail: keys are always strings.
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    escape_text(&pretty)
}

/// Whole-document JSON block.
pub(crate) fn document_block(value: &Value) -> String {
    format!("<pre>{}</pre>", pretty_escaped(value))
}

/// JSON block embedded between Markdown segments.
pub(crate) fn segment_block(value: &Value) -> String {
    format!("<pre><code>{}</code></pre>", pretty_escaped(value))
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
