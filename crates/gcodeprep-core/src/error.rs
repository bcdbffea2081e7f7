//! Error handling for gcodeprep
//!
//! Provides the error types raised while preprocessing G-code files:
//! - Format errors (input/output is not a G-code file)
//! - Lookup errors (unknown dialect or stage name)
//! - I/O failures raised from inside a stage
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Preprocessing error type
///
/// Represents failures of the preprocessing pipeline. Soft parse failures
/// never show up here; the line parser degrades malformed tokens to flags.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// Input or output path does not carry the G-code extension
    #[error("Not a G-code file: {} (expected .{expected})", path.display())]
    NotGcodeFile {
        /// The offending path.
        path: PathBuf,
        /// The extension that was required.
        expected: String,
    },

    /// Dialect name not present in the catalog
    #[error("Unknown dialect: {name}")]
    UnknownDialect {
        /// The requested dialect name.
        name: String,
    },

    /// Stage name not present in the catalog
    #[error("Unknown stage: {name}")]
    UnknownStage {
        /// The requested stage name.
        name: String,
    },

    /// A pipeline was built with no stages
    #[error("Pipeline has no stages")]
    EmptyPipeline,

    /// I/O failure while a stage was reading or writing
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        /// The stage that was running.
        stage: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl PreprocessError {
    /// Build a format error for `path`
    pub fn not_gcode(path: impl Into<PathBuf>, expected: impl Into<String>) -> Self {
        Self::NotGcodeFile {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Wrap an I/O error raised while `stage` was running
    pub fn stage_failed(stage: impl Into<String>, source: io::Error) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            source,
        }
    }
}

/// Main error type for gcodeprep
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Preprocessing error
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a format (wrong extension) error
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Preprocess(PreprocessError::NotGcodeFile { .. }))
    }

    /// Check if this is a dialect or stage lookup error
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            Error::Preprocess(
                PreprocessError::UnknownDialect { .. } | PreprocessError::UnknownStage { .. }
            )
        )
    }

    /// Check if this error came from the filesystem
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Preprocess(PreprocessError::StageFailed { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
