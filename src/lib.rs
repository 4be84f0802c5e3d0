//! DeepChat: a chat demo server that streams canned or proxied replies and
//! renders mixed Markdown/JSON text to sanitised HTML.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
