//! Typed chat message extracted from a mail archive.
//!
//! Every chat line in a Gmail archive is stored as its own mail record. The
//! extractor turns those records into [`ChatMessage`] values, which are the
//! only input the grouping, identity and rendering stages ever see.
//!
//! # Examples
//!
//! ```
//! use gchatlog::{ChatMessage, MessageStyle};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2014, 2, 1, 10, 0, 0).unwrap();
//! let msg = ChatMessage::new("1453", "Alice@Example.com", ts, MessageStyle::New, 0, "hi")
//!     .with_recipient("bob@example.com");
//!
//! assert_eq!(msg.sender, "alice@example.com");
//! assert_eq!(msg.whole_second(), ts.timestamp());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp precision class of a chat message.
///
/// Gmail switched chat storage formats around May 2013. Records from before
/// the switch carry XMPP stanzas with a millisecond timestamp; records after
/// it only have the RFC 2822 `Date` header, which stops at whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    /// XML stanza with genuine millisecond precision.
    Old,
    /// HTML mail with whole-second precision only.
    New,
}

impl std::fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStyle::Old => write!(f, "old"),
            MessageStyle::New => write!(f, "new"),
        }
    }
}

/// A single chat line recovered from the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Opaque grouping key (`X-GM-THRID`).
    pub thread_id: String,

    /// `Message-ID` of the carrying record. Diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub message_id: Option<String>,

    /// Lowercase sender address without XMPP resource.
    pub sender: String,

    /// Lowercase recipient address, when the record names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub recipient: Option<String>,

    /// Absolute instant. Whole seconds for [`MessageStyle::New`].
    pub timestamp: DateTime<Utc>,

    /// Precision class.
    pub style: MessageStyle,

    /// Arrival position across the whole archive stream.
    pub sequence_hint: u64,

    /// Decoded text, possibly spanning several lines.
    pub body: String,
}

impl ChatMessage {
    /// Creates a message, normalizing the sender address.
    pub fn new(
        thread_id: impl Into<String>,
        sender: &str,
        timestamp: DateTime<Utc>,
        style: MessageStyle,
        sequence_hint: u64,
        body: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            message_id: None,
            sender: normalize_address(sender),
            recipient: None,
            timestamp,
            style,
            sequence_hint,
            body: body.into(),
        }
    }

    /// Sets the recipient address (normalized).
    #[must_use]
    pub fn with_recipient(mut self, recipient: &str) -> Self {
        let normalized = normalize_address(recipient);
        self.recipient = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Sets the carrying record's `Message-ID`.
    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Seconds since the Unix epoch, truncated.
    pub fn whole_second(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// Millisecond part of the timestamp as stored in the archive.
    pub fn raw_millis(&self) -> u16 {
        self.timestamp.timestamp_subsec_millis() as u16
    }

    /// Returns `true` if the message carries genuine sub-second precision.
    pub fn is_old_style(&self) -> bool {
        self.style == MessageStyle::Old
    }
}

/// Canonical form of a chat address: trimmed, angle brackets and XMPP
/// resource removed, lowercased.
///
/// ```
/// use gchatlog::message::normalize_address;
///
/// assert_eq!(normalize_address(" <Bob@Gmail.com/Talk.v104A> "), "bob@gmail.com");
/// ```
pub fn normalize_address(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
    let bare = trimmed.split('/').next().unwrap_or_default();
    bare.trim().to_lowercase()
}
