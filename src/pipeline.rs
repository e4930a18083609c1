//! End-to-end run: archive in, transcripts and records out.
//!
//! [`Pipeline::run`] performs every stage in memory and returns a
//! [`PipelineOutput`]; nothing is written until
//! [`PipelineOutput::write_to`] is called, so a read error mid-archive
//! leaves no partial output behind.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use gchatlog::prelude::*;
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
//! let aliases = AliasMap::new().with_operator("me@example.com");
//! let pipeline = Pipeline::new(PipelineConfig::default(), aliases, Utc);
//! let output = pipeline.run(archive.as_bytes())?;
//!
//! let mut sink = MemorySink::new();
//! output.write_to(&mut sink)?;
//! assert!(sink.transcripts["friend@example.com"].contains("hello"));
//! assert!(sink.records.contains_key("1453.json"));
//! # Ok::<(), gchatlog::GchatError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;

use chrono::TimeZone;
use serde::Serialize;
use tracing::{info, warn};

use crate::alias::AliasMap;
use crate::config::PipelineConfig;
use crate::core::anomaly::{Anomaly, detect_all};
use crate::core::conversation::group_conversations;
use crate::core::identity::{ConversationFlag, IdentityResolver, OperatorInference};
use crate::core::output::{OutputSink, StructuredRenderer, TextRenderer};
use crate::error::Result;
use crate::extractor::{ExtractReport, RecordExtractor};
use crate::message::ChatMessage;

/// A conversation that resolved with irregularities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedConversation {
    /// Thread identifier.
    pub thread_id: String,
    /// Display name the conversation was filed under.
    pub counterpart: String,
    /// What was irregular.
    pub flags: Vec<ConversationFlag>,
}

/// Everything worth reporting about a run, collected after the full pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Extraction counters and dropped records.
    pub extract: ExtractReport,
    /// Operator address in effect.
    pub operator: Option<String>,
    /// Heuristic result, when no `operator_self` was configured.
    pub inference: Option<OperatorInference>,
    /// Conversations that raised flags.
    pub flagged: Vec<FlaggedConversation>,
    /// Timestamp regressions; empty unless anomaly reporting is enabled.
    pub anomalies: Vec<Anomaly>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "records: {} read, {} non-chat, {} dropped; {} messages",
            self.extract.records_seen,
            self.extract.non_chat,
            self.extract.dropped.len(),
            self.extract.messages
        )?;
        match &self.operator {
            Some(op) => writeln!(f, "operator: {op}")?,
            None => writeln!(f, "operator: unresolved")?,
        }
        for dropped in &self.extract.dropped {
            writeln!(f, "  dropped {dropped}")?;
        }
        for flagged in &self.flagged {
            let flags: Vec<String> = flagged.flags.iter().map(ToString::to_string).collect();
            writeln!(
                f,
                "  thread {} ({}): {}",
                flagged.thread_id,
                flagged.counterpart,
                flags.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Fully rendered result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Transcript text by person display name.
    pub transcripts: BTreeMap<String, String>,
    /// Structured record text by thread id.
    pub records: BTreeMap<String, String>,
    /// File extension of the records.
    pub record_extension: &'static str,
    /// Every address seen in any conversation.
    pub addresses: BTreeSet<String>,
    /// Number of conversations.
    pub conversations: usize,
    /// Run diagnostics.
    pub diagnostics: Diagnostics,
}

impl PipelineOutput {
    /// Returns `true` if the archive held no chat at all.
    pub fn is_empty(&self) -> bool {
        self.conversations == 0
    }

    /// Hands every transcript and record to a sink.
    pub fn write_to<S: OutputSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for (person, text) in &self.transcripts {
            sink.write_transcript(person, text)?;
        }
        for (thread_id, text) in &self.records {
            sink.write_record(thread_id, self.record_extension, text)?;
        }
        Ok(())
    }
}

/// The full reconstruction pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline<Tz: TimeZone> {
    config: PipelineConfig,
    aliases: AliasMap,
    timezone: Tz,
}

impl<Tz> Pipeline<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    /// Creates a pipeline. Transcript times are shown in `timezone`.
    pub fn new(config: PipelineConfig, aliases: AliasMap, timezone: Tz) -> Self {
        Self {
            config,
            aliases,
            timezone,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extracts every chat message. Fails only on I/O errors.
    pub fn extract<R: BufRead>(&self, reader: R) -> Result<(Vec<ChatMessage>, ExtractReport)> {
        let mut extraction = RecordExtractor::with_config(self.config.extract.clone()).extract(reader);
        let messages = extraction.by_ref().collect::<Result<Vec<_>>>()?;
        let report = extraction.into_report();
        info!(
            records = report.records_seen,
            non_chat = report.non_chat,
            dropped = report.dropped.len(),
            messages = report.messages,
            "extraction finished"
        );
        Ok((messages, report))
    }

    /// Runs every stage over an archive and renders the result in memory.
    pub fn run<R: BufRead>(&self, reader: R) -> Result<PipelineOutput> {
        let (messages, extract) = self.extract(reader)?;

        let conversations = group_conversations(messages);
        info!(conversations = conversations.len(), "messages grouped");

        let anomalies = if self.config.render.report_anomalies {
            let found = detect_all(&conversations);
            info!(anomalies = found.len(), "anomaly scan finished");
            found
        } else {
            Vec::new()
        };

        let resolver = IdentityResolver::new(&self.aliases, &conversations);
        let operator = resolver.operator().map(str::to_string);
        let inference = resolver.inference().cloned();
        let conversation_count = conversations.len();
        let resolved = resolver.resolve_all(conversations);

        let mut addresses = BTreeSet::new();
        let mut flagged = Vec::new();
        for conversation in &resolved {
            addresses.extend(conversation.participants.iter().map(|p| p.address.clone()));
            if conversation.is_flagged() {
                warn!(
                    thread = conversation.thread_id(),
                    flags = ?conversation.flags,
                    "conversation rendered best effort"
                );
                flagged.push(FlaggedConversation {
                    thread_id: conversation.thread_id().to_string(),
                    counterpart: conversation.counterpart().display_name.clone(),
                    flags: conversation.flags.clone(),
                });
            }
        }

        let text_renderer = TextRenderer::new(self.timezone.clone(), &self.config.render);
        let transcripts = text_renderer.render_transcripts(&resolved);

        let structured = StructuredRenderer::new(self.config.render.structured_format);
        let mut records = BTreeMap::new();
        for conversation in &resolved {
            records.insert(
                conversation.thread_id().to_string(),
                structured.render(conversation)?,
            );
        }
        info!(
            people = transcripts.len(),
            records = records.len(),
            "rendering finished"
        );

        Ok(PipelineOutput {
            transcripts,
            records,
            record_extension: structured.format().extension(),
            addresses,
            conversations: conversation_count,
            diagnostics: Diagnostics {
                extract,
                operator,
                inference,
                flagged,
                anomalies,
            },
        })
    }

    /// Convenience wrapper around [`run`](Self::run) for in-memory archives.
    pub fn run_str(&self, archive: &str) -> Result<PipelineOutput> {
        self.run(archive.as_bytes())
    }
}
