//! Command-line interface definition using clap.
//!
//! [`Args`] maps one-to-one onto [`PipelineConfig`] plus the few paths only
//! the binary cares about (archive, output directory, alias file).

use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    DEFAULT_LINE_WIDTH, ExtractConfig, PipelineConfig, RenderConfig, StructuredFormat,
};

/// Default alias file name, created inside the output directory.
pub const DEFAULT_ALIAS_FILE: &str = "aliases.txt";

/// Rebuild Gmail chat history from an mbox archive into per-person
/// transcripts and per-conversation records.
#[derive(Parser, Debug, Clone)]
#[command(name = "gchatlog")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    gchatlog 'All mail Including Spam and Trash.mbox'
    gchatlog archive.mbox -o chats --no-wrap
    gchatlog archive.mbox --analyze --format jsonl
    gchatlog archive.mbox --aliases ~/chat-names.txt")]
pub struct Args {
    /// Gmail archive (mbox format)
    pub mbox: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "gchatlog_data")]
    pub output: PathBuf,

    /// Don't wrap transcript lines; keep each message's own line breaks
    #[arg(short = 'n', long)]
    pub no_wrap: bool,

    /// Print timestamp regressions that hint at broken threads
    #[arg(short, long)]
    pub analyze: bool,

    /// Alias file (default: <OUTPUT>/aliases.txt, created on first run)
    #[arg(long, value_name = "FILE")]
    pub aliases: Option<PathBuf>,

    /// Structured record format (json, jsonl)
    #[arg(short, long, default_value = "json")]
    pub format: StructuredFormat,

    /// Transcript line width
    #[arg(short, long, default_value_t = DEFAULT_LINE_WIDTH)]
    pub width: usize,

    /// Accept records with a thread id even when they lack the Chat label
    #[arg(long)]
    pub include_unlabeled: bool,

    /// Verbose logging to stderr (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Alias file location.
    pub fn alias_path(&self) -> PathBuf {
        self.aliases
            .clone()
            .unwrap_or_else(|| self.output.join(DEFAULT_ALIAS_FILE))
    }

    /// Pipeline options selected by the flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_extract(ExtractConfig::new().with_require_chat_label(!self.include_unlabeled))
            .with_render(
                RenderConfig::new()
                    .with_preserve_line_breaks(self.no_wrap)
                    .with_report_anomalies(self.analyze)
                    .with_line_width(self.width)
                    .with_structured_format(self.format),
            )
    }
}
