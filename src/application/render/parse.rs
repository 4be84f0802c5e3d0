//! JSON detection shared by both render modes.

use serde::Deserialize;
use serde_json::Value;

/// Parse `text` as exactly one JSON document.
///
/// Nesting depth is unbounded; the stack grows on demand instead of
/// overflowing. Numbers outside the `f64` range are kept verbatim.
pub(crate) fn parse_json(text: &str) -> Option<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer)).ok()?;
    deserializer.end().ok()?;
    Some(value)
}
