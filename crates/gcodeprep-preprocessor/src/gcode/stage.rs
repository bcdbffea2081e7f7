//! Single-pass file stages
//!
//! A stage reads every line of one input file in order, decides a per-line
//! [`Action`] and writes the surviving lines to its output in the same order.

use std::io::{self, Write};
use std::path::Path;

use crate::utils::{split_terminator, GcodeFileReader};

use super::{apply_rules, Action, LineParser, ParsedLine, Rule};

/// Trait for G-code file stages
///
/// A stage instance handles exactly one file pass. Any carried state is reset
/// in [`Stage::begin`] and is owned by the stage alone.
pub trait Stage: Send {
    /// Get the name/identifier of this stage
    fn name(&self) -> &str;

    /// Get a description of what this stage does
    fn description(&self) -> &str;

    /// Prepare for a pass over `input`
    ///
    /// Called once before the first line. Stages that need whole-file
    /// information may read the input here.
    fn begin(&mut self, _input: &Path) -> io::Result<()> {
        Ok(())
    }

    /// Decide what happens to one line (terminator already removed)
    fn transform_line(&mut self, line: &str) -> Action;

    /// Text to append after the last line, if any
    fn finish(&mut self) -> Option<String> {
        None
    }
}

/// Boxed stage, owned by exactly one pipeline run
pub type StageHandle = Box<dyn Stage>;

/// Line counters for one stage pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Lines read from the input
    pub lines_read: u64,
    /// Lines written unchanged
    pub lines_passed: u64,
    /// Lines removed
    pub lines_dropped: u64,
    /// Lines replaced by new text
    pub lines_rewritten: u64,
    /// Insertions made ahead of an unchanged line
    pub lines_inserted: u64,
    /// Trailer blocks appended at end of file
    pub lines_appended: u64,
}

impl StageStats {
    /// True when the stage wrote its input back unchanged
    pub fn is_unchanged(&self) -> bool {
        self.lines_dropped == 0
            && self.lines_rewritten == 0
            && self.lines_inserted == 0
            && self.lines_appended == 0
    }
}

/// Run one stage over `input`, writing the result to `output`
pub fn run_stage<W: Write>(
    stage: &mut dyn Stage,
    input: &Path,
    output: &mut W,
) -> io::Result<StageStats> {
    let reader = GcodeFileReader::new(input)?;
    stage.begin(input)?;

    let mut stats = StageStats::default();
    let mut terminated = true;

    let lines_read = reader.for_each_raw_line(|raw| {
        let (body, terminator) = split_terminator(raw);
        let text = String::from_utf8_lossy(body);

        match stage.transform_line(&text) {
            Action::PassThrough => {
                output.write_all(raw)?;
                stats.lines_passed += 1;
                terminated = !terminator.is_empty();
            }
            Action::Drop => {
                stats.lines_dropped += 1;
            }
            Action::Rewrite(new_text) => {
                write_lines(output, &new_text, terminator)?;
                stats.lines_rewritten += 1;
                terminated = !terminator.is_empty();
            }
            Action::Prepend(inserted) => {
                let separator: &[u8] = if terminator.is_empty() {
                    b"\n"
                } else {
                    terminator
                };
                write_lines(output, &inserted, separator)?;
                output.write_all(raw)?;
                stats.lines_inserted += 1;
                stats.lines_passed += 1;
                terminated = !terminator.is_empty();
            }
        }
        Ok(())
    })?;
    stats.lines_read = lines_read;

    if let Some(trailer) = stage.finish() {
        if !terminated {
            output.write_all(b"\n")?;
        }
        write_lines(output, &trailer, b"\n")?;
        stats.lines_appended += 1;
    }

    output.flush()?;

    tracing::debug!(
        "Stage '{}' on {}: read {}, passed {}, dropped {}, rewritten {}, inserted {}, appended {}",
        stage.name(),
        input.display(),
        stats.lines_read,
        stats.lines_passed,
        stats.lines_dropped,
        stats.lines_rewritten,
        stats.lines_inserted,
        stats.lines_appended
    );

    Ok(stats)
}

/// Write `text`, using the original terminator for every line it holds
fn write_lines<W: Write>(output: &mut W, text: &str, terminator: &[u8]) -> io::Result<()> {
    let separator: &[u8] = if terminator.is_empty() {
        b"\n"
    } else {
        terminator
    };

    let mut parts = text.split('\n').peekable();
    while let Some(part) = parts.next() {
        output.write_all(part.as_bytes())?;
        if parts.peek().is_some() {
            output.write_all(separator)?;
        } else {
            output.write_all(terminator)?;
        }
    }
    Ok(())
}

/// A stage driven by an ordered rule table
///
/// Each line is parsed once; the first rule whose trigger code is present
/// decides the line, lines with no matching rule pass through verbatim.
#[derive(Debug, Clone)]
pub struct RuleStage {
    name: String,
    description: String,
    rules: Vec<Rule>,
    parser: LineParser,
}

impl RuleStage {
    /// Create a rule stage using the default line parser
    pub fn new(name: impl Into<String>, description: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self::with_parser(name, description, rules, LineParser::new())
    }

    /// Create a rule stage with an injected line parser
    pub fn with_parser(
        name: impl Into<String>,
        description: impl Into<String>,
        rules: Vec<Rule>,
        parser: LineParser,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules,
            parser,
        }
    }

    /// Get the rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Decide an already parsed line
    pub fn decide(&self, line: &ParsedLine) -> Action {
        apply_rules(&self.rules, line)
    }
}

impl Stage for RuleStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn transform_line(&mut self, line: &str) -> Action {
        let parsed = self.parser.parse(line);
        self.decide(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::TriggerCode;
    use std::fs;

    fn units_stage() -> RuleStage {
        RuleStage::new(
            "units",
            "Drops G21",
            vec![Rule::dropping("units", TriggerCode::MILLIMETER_UNITS)],
        )
    }

    fn run_on(stage: &mut dyn Stage, content: &str) -> (String, StageStats) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.gcode");
        fs::write(&input, content).unwrap();

        let mut out = Vec::new();
        let stats = run_stage(stage, &input, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    struct Uppercase;

    impl Stage for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercases every line and appends a trailer"
        }

        fn transform_line(&mut self, line: &str) -> Action {
            Action::Rewrite(line.to_uppercase())
        }

        fn finish(&mut self) -> Option<String> {
            Some("M2".to_string())
        }
    }

    #[test]
    fn test_rule_stage_drops_and_passes() {
        let (out, stats) = run_on(&mut units_stage(), "G21 ; units\n  G1 X1  \nG90\n");
        assert_eq!(out, "  G1 X1  \nG90\n");
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.lines_dropped, 1);
        assert_eq!(stats.lines_passed, 2);
    }

    #[test]
    fn test_pass_through_preserves_crlf() {
        let (out, stats) = run_on(&mut units_stage(), "G1 X1\r\nG21\r\nG1 X2");
        assert_eq!(out, "G1 X1\r\nG1 X2");
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn test_rewrite_keeps_terminator() {
        let (out, stats) = run_on(&mut Uppercase, "g1 x1\r\ng1 x2");
        assert_eq!(out, "G1 X1\r\nG1 X2\nM2\n");
        assert_eq!(stats.lines_rewritten, 2);
        assert_eq!(stats.lines_appended, 1);
    }

    struct Marker;

    impl Stage for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn description(&self) -> &str {
            "Inserts a marker before every line"
        }

        fn transform_line(&mut self, _line: &str) -> Action {
            Action::Prepend("M117 mark".to_string())
        }
    }

    #[test]
    fn test_prepend_keeps_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.gcode");
        fs::write(&input, b"G1 X1 ; temp\xe9rature\r\nG1 X2").unwrap();

        let mut out = Vec::new();
        let stats = run_stage(&mut Marker, &input, &mut out).unwrap();
        assert_eq!(
            out,
            b"M117 mark\r\nG1 X1 ; temp\xe9rature\r\nM117 mark\nG1 X2".to_vec()
        );
        assert_eq!(stats.lines_inserted, 2);
        assert_eq!(stats.lines_passed, 2);
        assert_eq!(stats.lines_rewritten, 0);
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn test_multi_line_rewrite() {
        let mut out = Vec::new();
        write_lines(&mut out, "M73 P0\nG1 X1", b"\r\n").unwrap();
        assert_eq!(out, b"M73 P0\r\nG1 X1\r\n");
    }

    #[test]
    fn test_empty_input() {
        let (out, stats) = run_on(&mut units_stage(), "");
        assert!(out.is_empty());
        assert_eq!(stats, StageStats::default());
    }

    #[test]
    fn test_missing_input() {
        let mut out = Vec::new();
        let result = run_stage(
            &mut units_stage(),
            Path::new("/nonexistent/in.gcode"),
            &mut out,
        );
        assert!(result.is_err());
    }
}
