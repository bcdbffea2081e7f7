//! # gcodeprep Core
//!
//! Error types and shared constants used by every gcodeprep crate.

pub mod constants;
pub mod error;

pub use error::{Error, PreprocessError, Result};
