//! # gchatlog
//!
//! Rebuilds Gmail chat history from a raw mbox archive export.
//!
//! ## Overview
//!
//! Gmail stores every chat line as its own mail record, mixed in with
//! ordinary mail and split across two storage formats:
//! - **old style** (before mid-2013): XMPP stanzas with millisecond timestamps
//! - **new style**: HTML mails whose `Date` header stops at whole seconds
//!
//! gchatlog pulls the chat records out, regroups them into conversations by
//! Gmail thread id, puts every conversation in a stable order (inventing
//! sub-second offsets where the archive has none), works out who is who, and
//! renders one plain-text transcript per correspondent plus one structured
//! record per conversation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use chrono::Local;
//! use gchatlog::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let aliases = AliasMap::parse_str(&std::fs::read_to_string("aliases.txt")?)?;
//!     let pipeline = Pipeline::new(PipelineConfig::default(), aliases, Local);
//!
//!     let output = pipeline.run(BufReader::new(File::open("archive.mbox")?))?;
//!     output.write_to(&mut DirectorySink::new("out"))?;
//!
//!     for anomaly in &output.diagnostics.anomalies {
//!         eprintln!("{anomaly}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`parsing`]: mbox splitting, XML stanzas, HTML bodies
//! - [`extractor`]: [`RecordExtractor`]: records → [`ChatMessage`]s
//! - [`core`](crate::core): grouping, identity, anomalies, renderers and sinks
//! - [`alias`]: [`AliasMap`]
//! - [`pipeline`]: [`Pipeline`], the whole run in one call
//! - [`config`]: option records
//! - [`error`]: [`GchatError`], [`Result`]
//! - [`prelude`]: convenient re-exports

pub mod alias;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extractor;
pub mod message;
pub mod parsing;
pub mod pipeline;

pub use alias::AliasMap;
pub use crate::core::anomaly::{Anomaly, detect_anomalies};
pub use crate::core::conversation::{Conversation, OrderedMessage, group_conversations};
pub use crate::core::identity::{IdentityResolver, infer_operator};
pub use error::{GchatError, Result};
pub use extractor::{ExtractReport, RecordExtractor};
pub use message::{ChatMessage, MessageStyle};
pub use pipeline::{Pipeline, PipelineOutput};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use gchatlog::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{ChatMessage, MessageStyle};

    pub use crate::error::{GchatError, Result};

    pub use crate::config::{ExtractConfig, PipelineConfig, RenderConfig, StructuredFormat};

    pub use crate::extractor::{DropReason, DroppedRecord, ExtractReport, RecordExtractor};

    pub use crate::alias::AliasMap;

    pub use crate::core::anomaly::{Anomaly, detect_anomalies};
    pub use crate::core::conversation::{Conversation, OrderedMessage, group_conversations};
    pub use crate::core::identity::{
        ConversationFlag, IdentityResolver, OperatorInference, Participant, ResolvedConversation,
        infer_operator,
    };
    pub use crate::core::output::{
        DirectorySink, MemorySink, OutputSink, StructuredRenderer, TextRenderer,
    };

    pub use crate::pipeline::{Diagnostics, Pipeline, PipelineOutput};
}
