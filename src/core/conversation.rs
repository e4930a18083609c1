//! Conversation grouping and in-thread ordering.
//!
//! Messages are bucketed by thread id and put in display order using the key
//! `(whole second, sub_ms, sequence_hint)`:
//!
//! - old-style messages keep their genuine millisecond value as `sub_ms`;
//! - new-style messages have no sub-second data, so those sharing a second
//!   within a thread are ranked by `sequence_hint` and given synthesized
//!   offsets 0, 1, 2, … (saturating at 999).
//!
//! Because both styles share the same key, a thread that mixes them is still
//! totally ordered.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::message::ChatMessage;

/// Largest sub-second offset that can be synthesized.
pub const MAX_SUB_MS: u16 = 999;

/// A message together with its position-defining sub-second value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMessage {
    /// The extracted message, untouched.
    pub message: ChatMessage,
    /// Genuine (old style) or synthesized (new style) milliseconds.
    pub sub_ms: u16,
    /// `true` if `sub_ms` was synthesized from arrival order.
    pub synthesized: bool,
}

impl OrderedMessage {
    /// Total-order key used for display.
    pub fn sort_key(&self) -> (i64, u16, u64) {
        (
            self.message.whole_second(),
            self.sub_ms,
            self.message.sequence_hint,
        )
    }

    /// Whole second plus `sub_ms`: the instant the message is shown at.
    pub fn ordered_timestamp(&self) -> DateTime<Utc> {
        let second = self.message.timestamp - Duration::milliseconds(i64::from(self.message.raw_millis()));
        second + Duration::milliseconds(i64::from(self.sub_ms))
    }
}

/// All messages of one thread, in display order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    thread_id: String,
    messages: Vec<OrderedMessage>,
}

impl Conversation {
    /// Orders the messages of a single thread.
    ///
    /// Returns `None` for an empty input. Messages are assumed to share
    /// `thread_id`.
    pub fn from_messages(thread_id: impl Into<String>, messages: Vec<ChatMessage>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self {
            thread_id: thread_id.into(),
            messages: order_thread(messages),
        })
    }

    /// Thread identifier shared by every message.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[OrderedMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The earliest message in display order.
    pub fn first(&self) -> &OrderedMessage {
        &self.messages[0]
    }

    /// Ordered timestamp of the first message.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.first().ordered_timestamp()
    }

    /// Messages in archive arrival order, i.e. the order the archive's own
    /// thread grouping put them in.
    pub fn arrival_order(&self) -> Vec<&ChatMessage> {
        let mut arrival: Vec<&ChatMessage> = self.messages.iter().map(|m| &m.message).collect();
        arrival.sort_by_key(|m| m.sequence_hint);
        arrival
    }
}

fn order_thread(messages: Vec<ChatMessage>) -> Vec<OrderedMessage> {
    // rank new-style messages within each second by arrival
    let mut same_second: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
    for msg in messages.iter().filter(|m| !m.is_old_style()) {
        same_second
            .entry(msg.whole_second())
            .or_default()
            .push(msg.sequence_hint);
    }
    for hints in same_second.values_mut() {
        hints.sort_unstable();
    }

    let mut ordered: Vec<OrderedMessage> = messages
        .into_iter()
        .map(|message| {
            if message.is_old_style() {
                let sub_ms = message.raw_millis();
                OrderedMessage {
                    message,
                    sub_ms,
                    synthesized: false,
                }
            } else {
                let rank = same_second
                    .get(&message.whole_second())
                    .and_then(|hints| hints.binary_search(&message.sequence_hint).ok())
                    .unwrap_or(0);
                let sub_ms = u16::try_from(rank).unwrap_or(MAX_SUB_MS).min(MAX_SUB_MS);
                OrderedMessage {
                    message,
                    sub_ms,
                    synthesized: true,
                }
            }
        })
        .collect();

    ordered.sort_by_key(OrderedMessage::sort_key);
    ordered
}

/// Partitions messages by thread id and orders every thread.
///
/// The result is sorted by thread id, so the same input always yields the
/// same output. An empty input yields an empty vector.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gchatlog::{ChatMessage, MessageStyle, group_conversations};
///
/// let t = Utc.with_ymd_and_hms(2014, 2, 1, 10, 0, 0).unwrap();
/// let msgs = vec![
///     ChatMessage::new("7", "a@x", t, MessageStyle::New, 0, "A"),
///     ChatMessage::new("7", "b@x", t, MessageStyle::New, 1, "B"),
/// ];
///
/// let conversations = group_conversations(msgs);
/// let offsets: Vec<u16> = conversations[0].messages().iter().map(|m| m.sub_ms).collect();
/// assert_eq!(offsets, vec![0, 1]);
/// ```
pub fn group_conversations<I>(messages: I) -> Vec<Conversation>
where
    I: IntoIterator<Item = ChatMessage>,
{
    let mut threads: BTreeMap<String, Vec<ChatMessage>> = BTreeMap::new();
    for msg in messages {
        threads.entry(msg.thread_id.clone()).or_default().push(msg);
    }

    threads
        .into_iter()
        .filter_map(|(thread_id, msgs)| Conversation::from_messages(thread_id, msgs))
        .collect()
}
