//! Mixed-content rendering: Markdown with embedded JSON blocks.
//!
//! The pipeline is pure: it accepts raw text and produces deterministic HTML.
//! Two detection modes coexist. Whole-document mode treats the input as one
//! JSON document or one Markdown document. Segmented mode walks the input line
//! by line so prose and inline JSON payloads can share a message.

mod parse;
mod segments;
mod service;
mod types;

pub use segments::{Segment, segment_text};
pub use service::{ComrakRenderService, render_service};
pub use types::{
    RenderMode, RenderResult, RenderService, SegmentedRender, contains_code_or_table,
};
