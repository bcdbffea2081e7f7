//! G-Code line parser
//!
//! Splits one text line into the command codes this pipeline recognizes,
//! the remaining parameter tokens (flags) and the trailing comment.
//! Parsing never fails: malformed tokens degrade to flags.

use std::collections::{BTreeMap, BTreeSet};

use gcodeprep_core::constants::COMMENT_DELIMITERS;

use super::TriggerCode;

/// Set of command letters whose tokens are parsed into numeric codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    letters: BTreeSet<char>,
}

impl Vocabulary {
    /// Create a vocabulary from the given letters (case-insensitive)
    pub fn new(letters: impl IntoIterator<Item = char>) -> Self {
        Self {
            letters: letters
                .into_iter()
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        }
    }

    /// Check whether `letter` is a recognized command letter
    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter.to_ascii_uppercase())
    }

    /// Iterate over the recognized letters in order
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.letters.iter().copied()
    }
}

impl Default for Vocabulary {
    /// G (preparatory) and M (miscellaneous) commands
    fn default() -> Self {
        Self::new(['G', 'M'])
    }
}

/// Structured form of one G-code line
///
/// Created per input line and discarded after the line has been decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Recognized command letter (upper-case) to its numeric code
    pub codes: BTreeMap<char, f64>,
    /// Parameter tokens that are not recognized codes, kept as written
    pub flags: BTreeSet<String>,
    /// Trailing comment without its delimiter, empty if absent
    pub comment: String,
}

impl ParsedLine {
    /// Get the numeric code for a command letter
    pub fn code(&self, letter: char) -> Option<f64> {
        self.codes.get(&letter.to_ascii_uppercase()).copied()
    }

    /// Check whether the line carries the given trigger code
    pub fn has_code(&self, trigger: TriggerCode) -> bool {
        self.code(trigger.letter) == Some(f64::from(trigger.number))
    }

    /// Check whether any flag token starts with `letter`
    pub fn has_flag_letter(&self, letter: char) -> bool {
        self.flags.iter().any(|flag| {
            flag.chars()
                .next()
                .is_some_and(|c| c.eq_ignore_ascii_case(&letter))
        })
    }

    /// Check whether `letter` appears at all, as a code or as a flag
    pub fn has_parameter(&self, letter: char) -> bool {
        self.code(letter).is_some() || self.has_flag_letter(letter)
    }

    /// Numeric value of the first flag starting with `letter`, if it parses
    pub fn flag_value(&self, letter: char) -> Option<f64> {
        if let Some(value) = self.code(letter) {
            return Some(value);
        }
        self.flags.iter().find_map(|flag| {
            let mut chars = flag.chars();
            let first = chars.next()?;
            if !first.eq_ignore_ascii_case(&letter) {
                return None;
            }
            chars.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
        })
    }

    /// True when the line holds no codes, flags or comment
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.flags.is_empty() && self.comment.is_empty()
    }
}

/// Pure, stateless G-code line parser
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    vocabulary: Vocabulary,
}

impl LineParser {
    /// Create a parser with the default G/M vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser recognizing a custom set of command letters
    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Get the vocabulary this parser recognizes
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Parse one line into codes, flags and comment
    ///
    /// A trailing line terminator is ignored. When a letter repeats on one
    /// line the last occurrence wins.
    pub fn parse(&self, line: &str) -> ParsedLine {
        let line = line.trim_end_matches(['\r', '\n']);
        let (body, comment) = split_comment(line);

        let mut parsed = ParsedLine {
            comment,
            ..ParsedLine::default()
        };

        for token in body.split_whitespace() {
            let Some(first) = token.chars().next() else {
                continue;
            };

            // Bare numbers carry no command letter
            if first.is_ascii_digit() || matches!(first, '+' | '-' | '.') {
                continue;
            }

            let letter = first.to_ascii_uppercase();
            if !self.vocabulary.contains(letter) {
                parsed.flags.insert(token.to_string());
                continue;
            }

            match token[first.len_utf8()..].parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    parsed.codes.insert(letter, value);
                }
                _ => {
                    parsed.flags.insert(token.to_string());
                }
            }
        }

        parsed
    }
}

/// Parse a line with the default vocabulary
pub fn parse_line(line: &str) -> ParsedLine {
    LineParser::new().parse(line)
}

fn split_comment(line: &str) -> (&str, String) {
    let Some(pos) = line.find(COMMENT_DELIMITERS) else {
        return (line, String::new());
    };

    let delimiter = line[pos..].chars().next().unwrap_or(';');
    let mut comment = line[pos + delimiter.len_utf8()..].trim();
    if delimiter == '(' {
        comment = comment.strip_suffix(')').unwrap_or(comment).trim_end();
    }

    (&line[..pos], comment.to_string())
}
