//! Conversation reconstruction.
//!
//! This module contains:
//! - [`conversation`] - grouping by thread and in-thread ordering
//! - [`identity`] - participants, operator and display names
//! - [`anomaly`] - timestamp regressions in the archive's thread order
//! - [`output`] - text and structured renderers, output sinks

pub mod anomaly;
pub mod conversation;
pub mod identity;
pub mod output;

pub use anomaly::{Anomaly, detect_all, detect_anomalies};
pub use conversation::{Conversation, OrderedMessage, group_conversations};
pub use identity::{
    ConversationFlag, IdentityResolver, OperatorInference, Participant, ResolvedConversation,
    infer_operator,
};
pub use output::{DirectorySink, MemorySink, OutputSink, StructuredRenderer, TextRenderer};
