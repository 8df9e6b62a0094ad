//! Grammars for the scalar annotation value types.
//!
//! Durations and quantities are involved enough to live in their own
//! modules; see [`crate::duration`] and [`crate::quantity`].

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use regex::Regex;
use serde::{Serialize, Serializer};

/// Parse a boolean, accepting the usual spellings of true and false.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    let r = match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => true,
        "0" | "f" | "F" | "FALSE" | "false" | "False" => false,
        _ => return None,
    };
    Some(r)
}

/// Parse a base-10 signed integer. An optional leading `+` or `-` is accepted.
pub(crate) fn parse_signed<T: FromStr>(s: &str) -> Option<T> {
    let digits = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a base-10 unsigned integer. Signs are rejected outright, including `+`.
pub(crate) fn parse_unsigned<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Split a comma separated list, trimming whitespace around each element.
pub(crate) fn parse_list(s: &str) -> Vec<String> {
    s.trim().split(',').map(|v| v.trim().to_owned()).collect()
}

/// A compiled regular expression that compares and serializes as its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile `s`.
    pub fn new(s: &str) -> Result<Self, regex::Error> {
        Regex::new(s).map(Self)
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Pattern {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
