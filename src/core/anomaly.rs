//! Out-of-order timestamp detection.
//!
//! The archive's thread grouping asserts an order: the order in which the
//! records of a thread arrive. Where a message in that order carries a raw
//! timestamp strictly earlier than the message before it, the grouping
//! disagrees with the clock, which usually means thread-assignment
//! corruption (threads merged or split by the exporter).

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::core::conversation::Conversation;

const EXCERPT_CHARS: usize = 40;

/// One out-of-order adjacency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    /// Thread the adjacency belongs to.
    pub thread_id: String,
    /// Arrival position of the offending (later-arriving, earlier-stamped)
    /// message.
    pub position: usize,
    /// Raw timestamp of the message before it.
    pub prior_timestamp: DateTime<Utc>,
    /// Raw timestamp of the offending message.
    pub offending_timestamp: DateTime<Utc>,
    /// First line of the prior body, shortened.
    pub prior_excerpt: String,
    /// First line of the offending body, shortened.
    pub offending_excerpt: String,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "! Out-of-order timestamp in thread {} at #{}: {} '{}' < {} '{}'",
            self.thread_id,
            self.position,
            self.offending_timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            self.offending_excerpt,
            self.prior_timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.prior_excerpt,
        )
    }
}

fn excerpt(body: &str) -> String {
    let line = body.lines().next().unwrap_or_default();
    let mut short: String = line.chars().take(EXCERPT_CHARS).collect();
    if line.chars().count() > EXCERPT_CHARS {
        short.push('…');
    }
    short
}

/// Every strict timestamp regression in a conversation's arrival order.
pub fn detect_anomalies(conversation: &Conversation) -> Vec<Anomaly> {
    let arrival = conversation.arrival_order();

    arrival
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1].timestamp < pair[0].timestamp)
        .map(|(idx, pair)| Anomaly {
            thread_id: conversation.thread_id().to_string(),
            position: idx + 1,
            prior_timestamp: pair[0].timestamp,
            offending_timestamp: pair[1].timestamp,
            prior_excerpt: excerpt(&pair[0].body),
            offending_excerpt: excerpt(&pair[1].body),
        })
        .collect()
}

/// Runs [`detect_anomalies`] over many conversations, in their order.
pub fn detect_all(conversations: &[Conversation]) -> Vec<Anomaly> {
    conversations.iter().flat_map(detect_anomalies).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::group_conversations;
    use crate::message::{ChatMessage, MessageStyle};
    use chrono::TimeZone;

    fn at(minute: u32, hint: u64) -> ChatMessage {
        let ts = Utc.with_ymd_and_hms(2013, 3, 1, 10, minute, 0).unwrap();
        ChatMessage::new("t", "a@x", ts, MessageStyle::New, hint, format!("10:{minute:02}"))
    }

    #[test]
    fn test_single_regression() {
        let convs = group_conversations(vec![at(0, 0), at(5, 1), at(2, 2), at(10, 3)]);
        let anomalies = detect_anomalies(&convs[0]);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.position, 2);
        assert_eq!(a.prior_excerpt, "10:05");
        assert_eq!(a.offending_excerpt, "10:02");
        assert!(a.offending_timestamp < a.prior_timestamp);
    }

    #[test]
    fn test_ordered_thread_is_clean() {
        let convs = group_conversations(vec![at(0, 0), at(0, 1), at(3, 2)]);
        assert!(detect_anomalies(&convs[0]).is_empty());
    }

    #[test]
    fn test_display_line() {
        let convs = group_conversations(vec![at(5, 0), at(2, 1)]);
        let line = detect_all(&convs)[0].to_string();
        assert!(line.starts_with("! Out-of-order timestamp in thread t at #1"));
        assert!(line.contains("'10:02' < "));
    }

    #[test]
    fn test_excerpt_shortened() {
        let long = "x".repeat(60);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_CHARS + 1);
        assert_eq!(excerpt("first\nsecond"), "first");
    }
}
