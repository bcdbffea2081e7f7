//! G-Code preprocessing
//!
//! This module provides:
//! - Line parsing into codes, flags and comment
//! - Trigger-code rules and their actions
//! - Single-pass file stages and the built-in dialect rule tables
//! - Multi-stage pipelines chained through temporary files
//! - The dialect catalog

pub mod catalog;
pub mod parser;
pub mod pipeline;
pub mod processors;
pub mod rule;
pub mod stage;

pub use catalog::*;
pub use parser::*;
pub use pipeline::*;
pub use processors::*;
pub use rule::*;
pub use stage::*;
