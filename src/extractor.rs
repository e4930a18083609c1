//! Record extractor: raw mbox records in, typed [`ChatMessage`]s out.
//!
//! The extractor is a lazy, single-pass iterator over the archive. Ordinary
//! mail is skipped silently, broken chat records are dropped and noted in
//! the [`ExtractReport`], and only I/O failures surface as errors.
//!
//! # Example
//!
//! ```rust
//! use gchatlog::extractor::RecordExtractor;
//!
//! let archive = "From 1@xxx Thu Jan 01 00:00:00 2014\n\
//! X-GM-THRID: 1453\n\
//! X-Gmail-Labels: Chat\n\
//! From: Friend <friend@example.com>\n\
//! To: me@example.com\n\
//! Date: Sat, 1 Feb 2014 10:00:00 +0000\n\
//! Content-Type: text/html; charset=UTF-8\n\
//! \n\
//! hello\n";
//!
//! let mut extraction = RecordExtractor::new().extract(archive.as_bytes());
//! let messages: Vec<_> = extraction.by_ref().collect::<Result<_, _>>()?;
//!
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].sender, "friend@example.com");
//! assert_eq!(extraction.report().non_chat, 0);
//! # Ok::<(), gchatlog::GchatError>(())
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;

use chrono::{DateTime, TimeZone, Utc};
use mailparse::{MailAddr, MailHeaderMap, ParsedMail, addrparse, dateparse, parse_mail};
use serde::Serialize;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::message::{ChatMessage, MessageStyle, normalize_address};
use crate::parsing::html::clean_html_body;
use crate::parsing::mbox::{MboxReader, RawRecord};
use crate::parsing::xml::extract_stanzas;

const THREAD_HEADER: &str = "X-GM-THRID";
const LABELS_HEADER: &str = "X-Gmail-Labels";
const CHAT_LABEL: &str = "Chat";

/// Why a chat record (or one stanza inside it) was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    /// No usable sender address.
    MissingSender,
    /// Timestamp absent or unparseable.
    MalformedTimestamp(String),
    /// Multi-user chat, which is not reconstructed.
    GroupChat,
    /// Structure is not a recognizable chat payload.
    Malformed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingSender => write!(f, "missing sender"),
            DropReason::MalformedTimestamp(detail) => write!(f, "malformed timestamp: {detail}"),
            DropReason::GroupChat => write!(f, "group chat (unsupported)"),
            DropReason::Malformed(detail) => write!(f, "malformed record: {detail}"),
        }
    }
}

/// Diagnostic entry for one dropped record or stanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    /// Zero-based archive position of the carrying record.
    pub index: usize,
    /// Thread the record claimed to belong to.
    pub thread_id: Option<String>,
    /// `Message-ID` of the carrying record.
    pub message_id: Option<String>,
    /// What was wrong.
    pub reason: DropReason,
}

impl fmt::Display for DroppedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record #{}", self.index)?;
        if let Some(id) = &self.message_id {
            write!(f, " <{id}>")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Counters and drop list gathered over one pass of the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    /// Records read from the archive.
    pub records_seen: usize,
    /// Records skipped as ordinary mail.
    pub non_chat: usize,
    /// Old-style chat records.
    pub old_style_records: usize,
    /// New-style chat records.
    pub new_style_records: usize,
    /// Chat messages emitted.
    pub messages: usize,
    /// Dropped records and stanzas, in archive order.
    pub dropped: Vec<DroppedRecord>,
}

impl ExtractReport {
    /// Returns `true` if nothing was dropped.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Result of examining one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Ordinary mail, not part of any chat.
    NonChat,
    /// Chat record that yielded messages, plus any stanza-level drops.
    Chat {
        /// Precision class of the record
        style: MessageStyle,
        /// Messages in record order
        messages: Vec<ChatMessage>,
        /// Stanzas left out of an otherwise usable record
        dropped: Vec<DroppedRecord>,
    },
    /// Chat record that yielded nothing usable.
    Dropped(DroppedRecord),
}

/// Turns mbox records into chat messages.
#[derive(Debug, Clone, Default)]
pub struct RecordExtractor {
    config: ExtractConfig,
}

impl RecordExtractor {
    /// Creates an extractor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with custom configuration.
    pub fn with_config(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Starts a lazy extraction over an archive.
    pub fn extract<R: BufRead>(&self, reader: R) -> Extraction<R> {
        Extraction {
            records: MboxReader::new(reader),
            extractor: self.clone(),
            queued: VecDeque::new(),
            next_hint: 0,
            report: ExtractReport::default(),
        }
    }

    /// Extracts every message from an in-memory archive.
    pub fn extract_str(&self, content: &str) -> Result<(Vec<ChatMessage>, ExtractReport)> {
        let mut extraction = self.extract(content.as_bytes());
        let messages = extraction.by_ref().collect::<Result<Vec<_>>>()?;
        Ok((messages, extraction.into_report()))
    }

    /// Classifies one record. `next_hint` is the arrival counter; it is
    /// advanced once per emitted message.
    pub fn examine(&self, record: &RawRecord, next_hint: &mut u64) -> RecordOutcome {
        let parsed = match parse_mail(&record.content) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Unparseable MIME cannot be told apart from chat, so report it.
                return RecordOutcome::Dropped(DroppedRecord {
                    index: record.index,
                    thread_id: None,
                    message_id: None,
                    reason: DropReason::Malformed(e.to_string()),
                });
            }
        };

        let Some(thread_id) = header(&parsed, THREAD_HEADER) else {
            return RecordOutcome::NonChat;
        };

        if self.config.require_chat_label {
            if let Some(labels) = header(&parsed, LABELS_HEADER) {
                if !labels.split(',').any(|label| label.trim() == CHAT_LABEL) {
                    return RecordOutcome::NonChat;
                }
            }
        }

        let context = RecordContext {
            index: record.index,
            thread_id,
            message_id: header(&parsed, "Message-ID")
                .map(|id| id.trim_start_matches('<').trim_end_matches('>').to_string()),
        };

        if parsed.subparts.is_empty() {
            examine_new_style(&parsed, &context, next_hint)
        } else {
            examine_old_style(&parsed, &context, next_hint)
        }
    }
}

struct RecordContext {
    index: usize,
    thread_id: String,
    message_id: Option<String>,
}

impl RecordContext {
    fn drop(&self, reason: DropReason) -> DroppedRecord {
        DroppedRecord {
            index: self.index,
            thread_id: Some(self.thread_id.clone()),
            message_id: self.message_id.clone(),
            reason,
        }
    }

    fn message(
        &self,
        sender: &str,
        timestamp: DateTime<Utc>,
        style: MessageStyle,
        next_hint: &mut u64,
        body: String,
    ) -> ChatMessage {
        let mut msg = ChatMessage::new(
            self.thread_id.clone(),
            sender,
            timestamp,
            style,
            *next_hint,
            body,
        );
        msg.message_id.clone_from(&self.message_id);
        *next_hint += 1;
        msg
    }
}

fn header(parsed: &ParsedMail<'_>, name: &str) -> Option<String> {
    parsed
        .headers
        .get_first_value(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First mailbox in an address header, falling back to the last
/// whitespace-separated token when the header doesn't parse.
fn header_address(value: &str) -> Option<String> {
    if let Ok(list) = addrparse(value) {
        for addr in list.iter() {
            let found = match addr {
                MailAddr::Single(info) => Some(info.addr.clone()),
                MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
            };
            if let Some(found) = found {
                let normalized = normalize_address(&found);
                if !normalized.is_empty() {
                    return Some(normalized);
                }
            }
        }
    }

    let normalized = normalize_address(value.split_whitespace().last()?);
    (!normalized.is_empty()).then_some(normalized)
}

/// Parses an RFC 2822 `Date` header to whole seconds, ignoring any trailing
/// comment such as `(PST)`.
fn parse_date_header(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let without_comment = value.split('(').next().unwrap_or(value).trim();
    let seconds = dateparse(without_comment).map_err(|e| format!("'{value}': {e}"))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| format!("'{value}': out of range"))
}

fn examine_new_style(
    parsed: &ParsedMail<'_>,
    context: &RecordContext,
    next_hint: &mut u64,
) -> RecordOutcome {
    let Some(sender) = header(parsed, "From").and_then(|from| header_address(&from)) else {
        return RecordOutcome::Dropped(context.drop(DropReason::MissingSender));
    };

    let timestamp = match header(parsed, "Date") {
        Some(date) => match parse_date_header(&date) {
            Ok(ts) => ts,
            Err(detail) => {
                return RecordOutcome::Dropped(
                    context.drop(DropReason::MalformedTimestamp(detail)),
                );
            }
        },
        None => {
            return RecordOutcome::Dropped(
                context.drop(DropReason::MalformedTimestamp("missing Date header".into())),
            );
        }
    };

    let payload = match parsed.get_body() {
        Ok(payload) => payload,
        Err(e) => return RecordOutcome::Dropped(context.drop(DropReason::Malformed(e.to_string()))),
    };

    let body = if parsed.ctype.mimetype.to_ascii_lowercase().contains("html") {
        clean_html_body(&payload)
    } else {
        payload.replace("\r\n", "\n").trim().to_string()
    };

    let mut msg = context.message(&sender, timestamp, MessageStyle::New, next_hint, body);
    if let Some(to) = header(parsed, "To").and_then(|to| header_address(&to)) {
        msg = msg.with_recipient(&to);
    }

    RecordOutcome::Chat {
        style: MessageStyle::New,
        messages: vec![msg],
        dropped: Vec::new(),
    }
}

fn examine_old_style(
    parsed: &ParsedMail<'_>,
    context: &RecordContext,
    next_hint: &mut u64,
) -> RecordOutcome {
    let first = &parsed.subparts[0];
    if !first.ctype.mimetype.eq_ignore_ascii_case("text/xml") {
        return RecordOutcome::Dropped(context.drop(DropReason::Malformed(format!(
            "first part is {}, not text/xml",
            first.ctype.mimetype
        ))));
    }

    let xml = match first.get_body() {
        Ok(xml) => xml,
        Err(e) => return RecordOutcome::Dropped(context.drop(DropReason::Malformed(e.to_string()))),
    };

    let stanzas = extract_stanzas(&xml);
    if stanzas.is_empty() {
        return RecordOutcome::Dropped(
            context.drop(DropReason::Malformed("no message stanzas".into())),
        );
    }
    if stanzas.iter().any(|s| s.is_groupchat()) {
        return RecordOutcome::Dropped(context.drop(DropReason::GroupChat));
    }

    let mut messages = Vec::new();
    let mut dropped = Vec::new();
    let mut previous_raw: Option<&str> = None;

    for stanza in &stanzas {
        // Exports sometimes repeat a stanza verbatim, timestamp included.
        let repeated = previous_raw == Some(stanza.raw.as_str());
        previous_raw = Some(stanza.raw.as_str());
        if repeated {
            continue;
        }

        let Some(body) = stanza.body.as_ref().filter(|b| !b.is_empty()) else {
            continue;
        };

        let Some(sender) = stanza
            .from
            .as_deref()
            .map(normalize_address)
            .filter(|s| !s.is_empty())
        else {
            dropped.push(context.drop(DropReason::MissingSender));
            continue;
        };

        let Some(timestamp) = stanza
            .time_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        else {
            dropped.push(context.drop(DropReason::MalformedTimestamp(
                "stanza without a valid <time ms>".into(),
            )));
            continue;
        };

        let mut msg = context.message(&sender, timestamp, MessageStyle::Old, next_hint, body.clone());
        if let Some(to) = stanza.to.as_deref() {
            msg = msg.with_recipient(to);
        }
        messages.push(msg);
    }

    if messages.is_empty() {
        if let Some(first_drop) = dropped.into_iter().next() {
            return RecordOutcome::Dropped(first_drop);
        }
        return RecordOutcome::Dropped(
            context.drop(DropReason::Malformed("no stanza with a body".into())),
        );
    }

    RecordOutcome::Chat {
        style: MessageStyle::Old,
        messages,
        dropped,
    }
}

/// Lazy iterator over the chat messages of an archive.
///
/// Yields messages in archive order. The [`ExtractReport`] is complete once
/// the iterator returns `None`.
pub struct Extraction<R: BufRead> {
    records: MboxReader<R>,
    extractor: RecordExtractor,
    queued: VecDeque<ChatMessage>,
    next_hint: u64,
    report: ExtractReport,
}

impl<R: BufRead> Extraction<R> {
    /// Diagnostics gathered so far.
    pub fn report(&self) -> &ExtractReport {
        &self.report
    }

    /// Consumes the iterator, returning its diagnostics.
    pub fn into_report(self) -> ExtractReport {
        self.report
    }

    fn record_dropped(&mut self, dropped: DroppedRecord) {
        debug!(
            index = dropped.index,
            thread = dropped.thread_id.as_deref().unwrap_or("-"),
            reason = %dropped.reason,
            "dropped chat record"
        );
        self.report.dropped.push(dropped);
    }
}

impl<R: BufRead> Iterator for Extraction<R> {
    type Item = Result<ChatMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(msg) = self.queued.pop_front() {
                self.report.messages += 1;
                return Some(Ok(msg));
            }

            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            self.report.records_seen += 1;

            match self.extractor.examine(&record, &mut self.next_hint) {
                RecordOutcome::NonChat => self.report.non_chat += 1,
                RecordOutcome::Dropped(dropped) => self.record_dropped(dropped),
                RecordOutcome::Chat {
                    style,
                    messages,
                    dropped,
                } => {
                    match style {
                        MessageStyle::Old => self.report.old_style_records += 1,
                        MessageStyle::New => self.report.new_style_records += 1,
                    }
                    for entry in dropped {
                        self.record_dropped(entry);
                    }
                    self.queued.extend(messages);
                }
            }
        }
    }
}
