//! Built-in stages
//!
//! Rule tables for the supported slicer dialects plus the two stateful
//! stages: start/end boilerplate removal and build-progress insertion.

use std::io;
use std::path::Path;

use crate::utils::GcodeFileReader;

use super::{Action, LineParser, ParsedLine, Rule, RuleStage, Stage, TriggerCode};

/// Stage name of the Skeinforge 50 rule table
pub const SKEINFORGE50_STAGE: &str = "skeinforge50";
/// Stage name of the generic slicer rule table
pub const SLICER_STAGE: &str = "slicer";
/// Stage name of the extruder RPM rule table
pub const RPM_STAGE: &str = "rpm";
/// Stage name of the start/end boilerplate remover
pub const START_END_STAGE: &str = "repg_start_end";
/// Stage name of the progress inserter
pub const PROGRESS_STAGE: &str = "progress";

// ============================================================================
// Rule tables
// ============================================================================

/// Rules for Skeinforge 50 output (verbose temperature polling)
///
/// The encoder defaults to millimeters and absolute positioning, and has no
/// use for temperature polls. An `M104` is kept only when it names a tool.
pub fn skeinforge50_rules() -> Vec<Rule> {
    vec![
        Rule::dropping("millimeter_units", TriggerCode::MILLIMETER_UNITS),
        Rule::dropping("absolute_positioning", TriggerCode::ABSOLUTE_POSITIONING),
        Rule::dropping("temperature_poll", TriggerCode::TEMPERATURE_POLL),
        Rule::new(
            "temperature_set",
            TriggerCode::TEMPERATURE_SET,
            keep_if_tool_selected,
        ),
    ]
}

/// Rules for slicers that emit explicit fan control
///
/// Fan state belongs to the machine start/end sequences, not inline commands.
pub fn slicer_rules() -> Vec<Rule> {
    vec![
        Rule::dropping("absolute_positioning", TriggerCode::ABSOLUTE_POSITIONING),
        Rule::dropping("millimeter_units", TriggerCode::MILLIMETER_UNITS),
        Rule::dropping("fan_on", TriggerCode::FAN_ON),
        Rule::dropping("fan_off", TriggerCode::FAN_OFF),
    ]
}

/// Rules replacing the legacy extruder RPM commands
///
/// `M101`-`M103` are dropped; `M108 T<n>` becomes the tool change `M135 T<n>`.
pub fn rpm_rules() -> Vec<Rule> {
    vec![
        Rule::dropping("extruder_forward", TriggerCode::EXTRUDER_ON_FORWARD),
        Rule::dropping("extruder_reverse", TriggerCode::EXTRUDER_ON_REVERSE),
        Rule::dropping("extruder_off", TriggerCode::EXTRUDER_OFF),
        Rule::new(
            "extruder_speed",
            TriggerCode::EXTRUDER_SPEED,
            rewrite_as_tool_change,
        ),
    ]
}

fn keep_if_tool_selected(line: &ParsedLine) -> Action {
    if line.has_parameter('T') {
        Action::PassThrough
    } else {
        Action::Drop
    }
}

fn rewrite_as_tool_change(line: &ParsedLine) -> Action {
    match line.flag_value('T') {
        Some(tool) if tool >= 0.0 && tool.fract() == 0.0 && tool <= f64::from(u32::MAX) => {
            Action::Rewrite(format!("M135 T{}", tool as u32))
        }
        _ => Action::Drop,
    }
}

/// Skeinforge 50 stage
pub fn skeinforge50_stage() -> RuleStage {
    RuleStage::new(
        SKEINFORGE50_STAGE,
        "Removes G21/G90/M105 and untargeted M104 emitted by Skeinforge 50",
        skeinforge50_rules(),
    )
}

/// Slicer stage
pub fn slicer_stage() -> RuleStage {
    RuleStage::new(
        SLICER_STAGE,
        "Removes G90/G21 declarations and M106/M107 fan commands",
        slicer_rules(),
    )
}

/// RPM stage
pub fn rpm_stage() -> RuleStage {
    RuleStage::new(
        RPM_STAGE,
        "Removes M101-M103 and converts M108 to M135 tool changes",
        rpm_rules(),
    )
}

// ============================================================================
// Start/end boilerplate removal
// ============================================================================

const BLOCK_BEGIN_MARKERS: [&str; 2] = [
    "**** beginning of start.gcode",
    "**** beginning of end.gcode",
];

const BLOCK_END_MARKERS: [&str; 2] = ["**** end of start.gcode", "**** end of end.gcode"];

/// Removes start/end G-code blocks embedded by the host software
///
/// The blocks are delimited by marker comments; markers are removed with
/// their block. An unterminated block runs to end of file.
#[derive(Debug, Clone, Default)]
pub struct StartEndBlockRemover {
    inside_block: bool,
}

impl StartEndBlockRemover {
    /// Create a new start/end block remover
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for StartEndBlockRemover {
    fn name(&self) -> &str {
        START_END_STAGE
    }

    fn description(&self) -> &str {
        "Removes embedded start.gcode and end.gcode blocks"
    }

    fn begin(&mut self, _input: &Path) -> io::Result<()> {
        self.inside_block = false;
        Ok(())
    }

    fn transform_line(&mut self, line: &str) -> Action {
        let lower = line.to_ascii_lowercase();

        if BLOCK_BEGIN_MARKERS.iter().any(|m| lower.contains(m)) {
            self.inside_block = true;
            Action::Drop
        } else if BLOCK_END_MARKERS.iter().any(|m| lower.contains(m)) {
            self.inside_block = false;
            Action::Drop
        } else if self.inside_block {
            Action::Drop
        } else {
            Action::PassThrough
        }
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Inserts `M73` build-progress commands
///
/// Existing `M73` lines are replaced, so a second pass changes nothing.
#[derive(Debug, Clone, Default)]
pub struct ProgressStage {
    parser: LineParser,
    total: u64,
    seen: u64,
    last_percent: Option<u64>,
}

impl ProgressStage {
    /// Create a new progress stage
    pub fn new() -> Self {
        Self::default()
    }

    fn is_progress(&self, line: &str) -> bool {
        self.parser
            .parse(line)
            .has_code(TriggerCode::BUILD_PROGRESS)
    }

    fn message(&self, percent: u64, current: u64) -> String {
        format!(
            "M73 P{percent} (progress ({percent}%): {current}/{})",
            self.total
        )
    }
}

impl Stage for ProgressStage {
    fn name(&self) -> &str {
        PROGRESS_STAGE
    }

    fn description(&self) -> &str {
        "Inserts M73 build progress commands"
    }

    fn begin(&mut self, input: &Path) -> io::Result<()> {
        let reader = GcodeFileReader::new(input)?;
        self.total = reader.count_lines_matching(|line| !self.is_progress(line))?;
        self.seen = 0;
        self.last_percent = None;
        Ok(())
    }

    fn transform_line(&mut self, line: &str) -> Action {
        if self.is_progress(line) {
            return Action::Drop;
        }

        let percent = self.seen * 100 / self.total.max(1);
        self.seen += 1;

        if self.last_percent == Some(percent) {
            return Action::PassThrough;
        }

        self.last_percent = Some(percent);
        Action::Prepend(self.message(percent, self.seen - 1))
    }

    fn finish(&mut self) -> Option<String> {
        if self.total == 0 || self.last_percent == Some(100) {
            return None;
        }
        self.last_percent = Some(100);
        Some(self.message(100, self.total))
    }
}
