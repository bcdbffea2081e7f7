//! Utility modules

pub mod file_io;

pub use file_io::{ensure_gcode_file, has_extension, split_terminator, GcodeFileReader};
