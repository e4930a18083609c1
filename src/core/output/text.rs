//! Plain-text transcripts, one per correspondent.
//!
//! Each conversation is laid out as:
//!
//! ```text
//! ----------------------------------------
//! 2014-02-01
//!
//! 10:00  Alice: hi there, this body is long enough to be wrapped onto a
//!               second line under the message text
//!        Me:    hello
//! 10:01  Alice: bye
//! ```
//!
//! The clock column and the speaker column are blanked when they repeat.
//! A fresh date header appears whenever the local date changes.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::TimeZone;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::RenderConfig;
use crate::core::identity::ResolvedConversation;

/// Width of the dash line opening every conversation.
pub const SEPARATOR_WIDTH: usize = 40;

const TIME_WIDTH: usize = 5;
const TIME_PADDING: usize = 2;
const NAME_PADDING: usize = 1;

/// Renders resolved conversations as text in a given timezone.
#[derive(Debug, Clone)]
pub struct TextRenderer<Tz: TimeZone> {
    timezone: Tz,
    preserve_line_breaks: bool,
    line_width: usize,
}

impl<Tz> TextRenderer<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    /// Creates a renderer for the given timezone and options.
    pub fn new(timezone: Tz, config: &RenderConfig) -> Self {
        Self {
            timezone,
            preserve_line_breaks: config.preserve_line_breaks,
            line_width: config.line_width,
        }
    }

    /// Renders one conversation, separator line included.
    pub fn render_conversation(&self, resolved: &ResolvedConversation) -> String {
        let longest_name = resolved
            .participants
            .iter()
            .map(|p| p.display_name.width())
            .max()
            .unwrap_or(0);
        let time_column = TIME_WIDTH + TIME_PADDING;
        let name_column = longest_name + 1 + NAME_PADDING;
        let wrap_width = self
            .line_width
            .saturating_sub(time_column + name_column)
            .max(1);
        let indent = " ".repeat(time_column + name_column);

        let mut out = "-".repeat(SEPARATOR_WIDTH);
        let mut prev_date: Option<String> = None;
        let mut prev_time: Option<String> = None;
        let mut prev_speaker: Option<&str> = None;

        for ordered in resolved.conversation.messages() {
            let msg = &ordered.message;
            let local = msg.timestamp.with_timezone(&self.timezone);

            let date = local.format("%Y-%m-%d").to_string();
            if prev_date.as_deref() != Some(date.as_str()) {
                let _ = write!(out, "\n{date}\n\n");
                prev_date = Some(date);
            }

            let time = local.format("%H:%M").to_string();
            if prev_time.as_deref() == Some(time.as_str()) {
                out.push_str(&" ".repeat(time_column));
            } else {
                out.push_str(&time);
                out.push_str(&" ".repeat(TIME_PADDING));
                prev_time = Some(time);
            }

            let speaker = resolved.display_name(&msg.sender);
            if prev_speaker == Some(speaker) {
                out.push_str(&" ".repeat(name_column));
            } else {
                out.push_str(speaker);
                out.push(':');
                out.push_str(&" ".repeat(name_column.saturating_sub(speaker.width() + 1)));
                prev_speaker = Some(speaker);
            }

            let lines = if self.preserve_line_breaks {
                split_lines(&msg.body)
            } else {
                wrap_text(&msg.body, wrap_width)
            };
            let mut lines = lines.into_iter();
            out.push_str(&lines.next().unwrap_or_default());
            out.push('\n');
            for line in lines {
                out.push_str(&indent);
                out.push_str(&line);
                out.push('\n');
            }
        }

        out
    }

    /// Renders every conversation, grouped into one transcript per
    /// counterpart display name.
    ///
    /// Within a transcript, conversations follow the order of their first
    /// message (ties by thread id).
    pub fn render_transcripts(
        &self,
        conversations: &[ResolvedConversation],
    ) -> BTreeMap<String, String> {
        let mut by_person: BTreeMap<String, Vec<&ResolvedConversation>> = BTreeMap::new();
        for resolved in conversations {
            by_person
                .entry(resolved.counterpart().display_name.clone())
                .or_default()
                .push(resolved);
        }

        by_person
            .into_iter()
            .map(|(person, mut convs)| {
                convs.sort_by(|a, b| {
                    a.conversation
                        .first()
                        .sort_key()
                        .cmp(&b.conversation.first().sort_key())
                        .then_with(|| a.thread_id().cmp(b.thread_id()))
                });
                let text: String = convs.iter().map(|c| self.render_conversation(c)).collect();
                (person, text)
            })
            .collect()
    }
}

fn split_lines(body: &str) -> Vec<String> {
    let lines: Vec<String> = body.lines().map(str::to_string).collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

/// Splits `word` after at most `max` display columns. The first character is
/// always taken so that progress is guaranteed.
fn take_columns(word: &str, max: usize) -> (&str, &str) {
    let mut used = 0;
    for (idx, c) in word.char_indices() {
        let w = c.width().unwrap_or(0);
        if idx > 0 && used + w > max {
            return word.split_at(idx);
        }
        used += w;
    }
    (word, "")
}

/// Greedy word wrap to `width` display columns.
///
/// Runs of whitespace (newlines included) collapse to single spaces and
/// words wider than a line are broken. Always returns at least one line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let mut rest = word;
        while !rest.is_empty() {
            let rest_width = rest.width();

            if current.is_empty() {
                if rest_width <= width {
                    current.push_str(rest);
                    current_width = rest_width;
                    break;
                }
                let (head, tail) = take_columns(rest, width);
                lines.push(head.to_string());
                rest = tail;
                continue;
            }

            if current_width + 1 + rest_width <= width {
                current.push(' ');
                current.push_str(rest);
                current_width += 1 + rest_width;
                break;
            }

            if rest_width > width && current_width + 1 < width {
                // fill the remainder of this line with the start of the long word
                let (head, tail) = take_columns(rest, width - current_width - 1);
                current.push(' ');
                current.push_str(head);
                rest = tail;
            }
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
