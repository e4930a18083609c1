//! Per-conversation structured records (JSON or JSON Lines).
//!
//! # JSON
//! ```json
//! {
//!   "thread_id": "1453",
//!   "operator": "me@gmail.com",
//!   "participants": [{"address": "...", "display_name": "...", "is_operator": true}],
//!   "flags": [],
//!   "messages": [
//!     {"from": "me@gmail.com", "to": "bob@gmail.com",
//!      "timestamp": "2014-02-01T10:00:00.001Z", "time_ms": 1391248800001,
//!      "sub_ms": 1, "synthesized": true, "style": "new", "body": "hi"}
//!   ]
//! }
//! ```
//!
//! # JSON Lines
//! The first line is the conversation header (everything but `messages`,
//! plus `message_count`); each following line is one message.
//!
//! Bodies are written verbatim. Nothing is wrapped or trimmed.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::config::StructuredFormat;
use crate::core::conversation::OrderedMessage;
use crate::core::identity::{ConversationFlag, Participant, ResolvedConversation};
use crate::error::Result;
use crate::message::MessageStyle;

#[derive(Serialize)]
struct RecordHeader<'a> {
    thread_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<&'a str>,
    participants: &'a [Participant],
    flags: &'a [ConversationFlag],
    #[serde(skip_serializing_if = "Option::is_none")]
    message_count: Option<usize>,
}

#[derive(Serialize)]
struct MessageRecord<'a> {
    from: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a str>,
    timestamp: String,
    time_ms: i64,
    sub_ms: u16,
    synthesized: bool,
    style: MessageStyle,
    body: &'a str,
}

impl<'a> MessageRecord<'a> {
    fn from_ordered(ordered: &'a OrderedMessage) -> Self {
        let instant = ordered.ordered_timestamp();
        Self {
            from: &ordered.message.sender,
            to: ordered.message.recipient.as_deref(),
            timestamp: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            time_ms: instant.timestamp_millis(),
            sub_ms: ordered.sub_ms,
            synthesized: ordered.synthesized,
            style: ordered.message.style,
            body: &ordered.message.body,
        }
    }
}

#[derive(Serialize)]
struct ConversationRecord<'a> {
    #[serde(flatten)]
    header: RecordHeader<'a>,
    messages: Vec<MessageRecord<'a>>,
}

fn header(resolved: &ResolvedConversation, with_count: bool) -> RecordHeader<'_> {
    RecordHeader {
        thread_id: resolved.thread_id(),
        operator: resolved.operator.as_deref(),
        participants: &resolved.participants,
        flags: &resolved.flags,
        message_count: with_count.then(|| resolved.conversation.len()),
    }
}

/// Serializes one conversation as a pretty-printed JSON document.
pub fn to_json(resolved: &ResolvedConversation) -> Result<String> {
    let record = ConversationRecord {
        header: header(resolved, false),
        messages: resolved
            .conversation
            .messages()
            .iter()
            .map(MessageRecord::from_ordered)
            .collect(),
    };
    let mut json = serde_json::to_string_pretty(&record)?;
    json.push('\n');
    Ok(json)
}

/// Serializes one conversation as JSON Lines: a header line, then one line
/// per message.
pub fn to_jsonl(resolved: &ResolvedConversation) -> Result<String> {
    let mut out = serde_json::to_string(&header(resolved, true))?;
    out.push('\n');
    for ordered in resolved.conversation.messages() {
        out.push_str(&serde_json::to_string(&MessageRecord::from_ordered(ordered))?);
        out.push('\n');
    }
    Ok(out)
}

/// Renders conversations in the configured structured format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredRenderer {
    format: StructuredFormat,
}

impl StructuredRenderer {
    /// Creates a renderer for the given format.
    pub fn new(format: StructuredFormat) -> Self {
        Self { format }
    }

    /// The format in use.
    pub fn format(&self) -> StructuredFormat {
        self.format
    }

    /// Renders one conversation.
    pub fn render(&self, resolved: &ResolvedConversation) -> Result<String> {
        match self.format {
            StructuredFormat::Json => to_json(resolved),
            StructuredFormat::Jsonl => to_jsonl(resolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasMap;
    use crate::core::conversation::group_conversations;
    use crate::core::identity::IdentityResolver;
    use crate::message::ChatMessage;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn sample() -> ResolvedConversation {
        let t = Utc.with_ymd_and_hms(2014, 2, 1, 10, 0, 0).unwrap();
        let messages = vec![
            ChatMessage::new("42", "me@x.com", t, MessageStyle::New, 0, "line one\n  line two ")
                .with_recipient("a@x.com"),
            ChatMessage::new("42", "a@x.com", t, MessageStyle::New, 1, "<b>&amp;</b>")
                .with_recipient("me@x.com"),
        ];
        let aliases = AliasMap::new().with_alias("a@x.com", "Alice");
        let convs = group_conversations(messages);
        IdentityResolver::with_operator(&aliases, Some("me@x.com"))
            .resolve_all(convs)
            .remove(0)
    }

    #[test]
    fn test_json_record() {
        let json = to_json(&sample()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["thread_id"], "42");
        assert_eq!(value["operator"], "me@x.com");
        assert_eq!(value["participants"][1]["display_name"], "Alice");
        assert_eq!(value["flags"].as_array().unwrap().len(), 0);
        assert!(value.get("message_count").is_none());

        let second = &value["messages"][1];
        assert_eq!(second["sub_ms"], 1);
        assert_eq!(second["synthesized"], true);
        assert_eq!(second["style"], "new");
        assert_eq!(second["timestamp"], "2014-02-01T10:00:00.001Z");
        assert_eq!(second["time_ms"], 1_391_248_800_001_i64);
    }

    #[test]
    fn test_bodies_verbatim() {
        let json = to_json(&sample()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["messages"][0]["body"], "line one\n  line two ");
        assert_eq!(value["messages"][1]["body"], "<b>&amp;</b>");
    }

    #[test]
    fn test_jsonl_lines() {
        let text = StructuredRenderer::new(StructuredFormat::Jsonl)
            .render(&sample())
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["message_count"], 2);
        let first: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["from"], "me@x.com");
        assert_eq!(first["to"], "a@x.com");
    }
}
