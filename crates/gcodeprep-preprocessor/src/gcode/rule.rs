//! Trigger-code rules
//!
//! A rule is bound to one command code and decides what happens to a line
//! carrying that code. Stages evaluate their rules in declared order and
//! apply only the first rule whose trigger is present.

use std::fmt;

use super::ParsedLine;

/// A command letter and code number, e.g. `G21` or `M104`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerCode {
    /// Command letter (upper-case)
    pub letter: char,
    /// Command number
    pub number: u16,
}

impl TriggerCode {
    /// Create a trigger code
    pub const fn new(letter: char, number: u16) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            number,
        }
    }

    /// G21: programming in millimeters
    pub const MILLIMETER_UNITS: Self = Self::new('G', 21);
    /// G90: absolute positioning
    pub const ABSOLUTE_POSITIONING: Self = Self::new('G', 90);
    /// M73: build progress
    pub const BUILD_PROGRESS: Self = Self::new('M', 73);
    /// M101: extruder on, forward
    pub const EXTRUDER_ON_FORWARD: Self = Self::new('M', 101);
    /// M102: extruder on, reverse
    pub const EXTRUDER_ON_REVERSE: Self = Self::new('M', 102);
    /// M103: extruder off
    pub const EXTRUDER_OFF: Self = Self::new('M', 103);
    /// M104: set extruder temperature
    pub const TEMPERATURE_SET: Self = Self::new('M', 104);
    /// M105: get extruder temperature
    pub const TEMPERATURE_POLL: Self = Self::new('M', 105);
    /// M106: fan on
    pub const FAN_ON: Self = Self::new('M', 106);
    /// M107: fan off
    pub const FAN_OFF: Self = Self::new('M', 107);
    /// M108: set extruder speed
    pub const EXTRUDER_SPEED: Self = Self::new('M', 108);
}

impl fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

/// What a stage does with one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remove the line, comment included
    Drop,
    /// Write the line exactly as read
    PassThrough,
    /// Replace the line body; the original line terminator is kept.
    /// Embedded `\n` separate several output lines.
    Rewrite(String),
    /// Insert text before the line, which is then written exactly as read.
    /// Embedded `\n` separate several inserted lines.
    Prepend(String),
}

/// Decision function of a rule
pub type Decide = fn(&ParsedLine) -> Action;

/// A named trigger/decision pair
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    name: &'static str,
    trigger: TriggerCode,
    decide: Decide,
}

impl Rule {
    /// Create a rule with a custom decision
    pub fn new(name: &'static str, trigger: TriggerCode, decide: Decide) -> Self {
        Self {
            name,
            trigger,
            decide,
        }
    }

    /// Create a rule that removes every line carrying `trigger`
    pub fn dropping(name: &'static str, trigger: TriggerCode) -> Self {
        Self::new(name, trigger, drop_line)
    }

    /// Get the rule name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the trigger code
    pub fn trigger(&self) -> TriggerCode {
        self.trigger
    }

    /// Check whether this rule fires for the line
    pub fn matches(&self, line: &ParsedLine) -> bool {
        line.has_code(self.trigger)
    }

    /// Decide the action for a line this rule matched
    pub fn decide(&self, line: &ParsedLine) -> Action {
        (self.decide)(line)
    }
}

/// Apply the first matching rule, or pass the line through
pub fn apply_rules(rules: &[Rule], line: &ParsedLine) -> Action {
    rules
        .iter()
        .find(|rule| rule.matches(line))
        .map_or(Action::PassThrough, |rule| rule.decide(line))
}

fn drop_line(_line: &ParsedLine) -> Action {
    Action::Drop
}
