//! Unified error types for gchatlog.
//!
//! Only conditions that stop a run are errors. Bad records and odd
//! conversations are diagnostics (see [`crate::extractor::ExtractReport`] and
//! [`crate::core::identity::ConversationFlag`]) and never surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for gchatlog operations.
///
/// # Example
///
/// ```rust
/// use gchatlog::error::Result;
/// use gchatlog::ChatMessage;
///
/// fn my_function() -> Result<Vec<ChatMessage>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, GchatError>;

/// The error type for all gchatlog operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GchatError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The archive doesn't exist or can't be read
    /// - Permission denied
    /// - Disk is full (when writing output)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse an input file.
    #[error("Failed to parse {format}{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The format being parsed (e.g., "alias map")
        format: &'static str,
        /// The underlying parse error
        #[source]
        source: ParseErrorKind,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The input doesn't match the expected structure at all.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        /// The format that was expected
        format: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// A line of the alias map could not be understood.
    #[error("Invalid alias map entry on line {line}: {message}")]
    InvalidAlias {
        /// One-based line number
        line: usize,
        /// Description of what's wrong
        message: String,
    },

    /// JSON serialization error while rendering structured records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Kinds of parse errors that can occur.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// A line that could not be understood
    #[error("line {line}: {message}")]
    Entry {
        /// One-based line number
        line: usize,
        /// Description of what's wrong
        message: String,
    },
    /// The file is not valid UTF-8
    #[error("{0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl GchatError {
    /// Creates a parse error for the alias map file.
    pub fn alias_parse(source: impl Into<ParseErrorKind>, path: Option<PathBuf>) -> Self {
        GchatError::Parse {
            format: "alias map",
            source: source.into(),
            path,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        GchatError::InvalidFormat {
            format,
            message: message.into(),
        }
    }

    /// Creates an invalid alias entry error.
    pub fn invalid_alias(line: usize, message: impl Into<String>) -> Self {
        GchatError::InvalidAlias {
            line,
            message: message.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, GchatError::Io(_))
    }

    /// Returns `true` if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, GchatError::Parse { .. })
    }

    /// Returns `true` if this is an invalid format error.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, GchatError::InvalidFormat { .. })
    }

    /// Returns `true` if this is an alias map error.
    pub fn is_invalid_alias(&self) -> bool {
        matches!(self, GchatError::InvalidAlias { .. })
    }
}
