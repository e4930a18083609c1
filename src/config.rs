//! Configuration types for extraction and rendering.
//!
//! These are plain option records with no CLI framework dependency. The CLI
//! builds them from its flags; library users build them directly.
//!
//! # Example
//!
//! ```rust
//! use gchatlog::config::{PipelineConfig, RenderConfig};
//!
//! let render = RenderConfig::new()
//!     .with_preserve_line_breaks(true)
//!     .with_report_anomalies(true);
//!
//! let config = PipelineConfig::new().with_render(render);
//! assert!(config.render.preserve_line_breaks);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::GchatError;

/// Default total width of a text transcript line.
pub const DEFAULT_LINE_WIDTH: usize = 79;

/// Format of the per-conversation structured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredFormat {
    /// One pretty-printed JSON document per conversation.
    #[default]
    Json,

    /// A header line followed by one JSON object per message.
    Jsonl,
}

impl StructuredFormat {
    /// Returns the file extension for this format (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            StructuredFormat::Json => "json",
            StructuredFormat::Jsonl => "jsonl",
        }
    }

    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["json", "jsonl", "ndjson"]
    }
}

impl std::fmt::Display for StructuredFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuredFormat::Json => write!(f, "JSON"),
            StructuredFormat::Jsonl => write!(f, "JSONL"),
        }
    }
}

impl std::str::FromStr for StructuredFormat {
    type Err = GchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StructuredFormat::Json),
            "jsonl" | "ndjson" => Ok(StructuredFormat::Jsonl),
            _ => Err(GchatError::invalid_format(
                "structured record",
                format!(
                    "unknown format '{}', expected one of: {}",
                    s,
                    StructuredFormat::all_names().join(", ")
                ),
            )),
        }
    }
}

/// Configuration for the record extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Treat records whose `X-Gmail-Labels` header lacks `Chat` as ordinary
    /// mail (default: true). Records without the header are unaffected.
    pub require_chat_label: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            require_chat_label: true,
        }
    }
}

impl ExtractConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the `Chat` label is required.
    #[must_use]
    pub fn with_require_chat_label(mut self, require: bool) -> Self {
        self.require_chat_label = require;
        self
    }
}

/// Options consumed by the renderers and the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Keep each body's own line breaks instead of re-wrapping (default: false).
    pub preserve_line_breaks: bool,

    /// Run the anomaly detector and include its report (default: false).
    pub report_anomalies: bool,

    /// Total text line width used when wrapping (default: 79).
    pub line_width: usize,

    /// Structured record format (default: JSON).
    pub structured_format: StructuredFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preserve_line_breaks: false,
            report_anomalies: false,
            line_width: DEFAULT_LINE_WIDTH,
            structured_format: StructuredFormat::Json,
        }
    }
}

impl RenderConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables line break preservation.
    #[must_use]
    pub fn with_preserve_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }

    /// Enables or disables the anomaly report.
    #[must_use]
    pub fn with_report_anomalies(mut self, report: bool) -> Self {
        self.report_anomalies = report;
        self
    }

    /// Sets the total line width for wrapped transcripts.
    #[must_use]
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Sets the structured record format.
    #[must_use]
    pub fn with_structured_format(mut self, format: StructuredFormat) -> Self {
        self.structured_format = format;
        self
    }
}

/// Complete set of options for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extractor options
    pub extract: ExtractConfig,
    /// Renderer options
    pub render: RenderConfig,
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the extractor options.
    #[must_use]
    pub fn with_extract(mut self, extract: ExtractConfig) -> Self {
        self.extract = extract;
        self
    }

    /// Replaces the renderer options.
    #[must_use]
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }
}
