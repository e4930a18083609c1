//! Renderers and output sinks.
//!
//! - [`text`] - per-person plain-text transcripts ([`TextRenderer`])
//! - [`structured`] - per-conversation JSON / JSON Lines records ([`StructuredRenderer`])
//! - [`sink`] - where rendered output goes ([`DirectorySink`], [`MemorySink`])
//!
//! # Choosing a Record Format
//!
//! | Format | Use Case |
//! |--------|----------|
//! | JSON | Reading a single conversation, tooling that loads whole documents |
//! | JSONL | Streaming, line-oriented tools such as `jq -c` or `grep` |

pub mod sink;
pub mod structured;
pub mod text;

pub use sink::{DirectorySink, MemorySink, OutputSink, sanitize_file_name};
pub use structured::{StructuredRenderer, to_json, to_jsonl};
pub use text::{TextRenderer, wrap_text};
