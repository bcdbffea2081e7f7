//! Shared constants

/// File extension (without the dot) expected on every G-code input and output
pub const GCODE_EXTENSION: &str = "gcode";

/// Dialect used when neither the command line nor the config names one
pub const DEFAULT_DIALECT: &str = "skeinforge50";

/// Comment delimiters recognized by the line parser
pub const COMMENT_DELIMITERS: [char; 2] = [';', '('];
