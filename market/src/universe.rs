//! Instrument universe parsing.
//!
//! The universe file is newline-delimited: a 4-digit code, optionally
//! followed by a display name. Anything else is ignored.

use std::collections::BTreeSet;

/// Exchange suffix appended to listed codes.
pub const LISTED_SUFFIX: &str = ".TW";

/// Deduplicated instrument codes in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    codes: BTreeSet<String>,
}

impl Universe {
    /// Parses the universe text and merges in the mandatory codes.
    pub fn parse<S: AsRef<str>>(text: &str, mandatory: &[S]) -> Self {
        let mut codes: BTreeSet<String> = mandatory
            .iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| is_listed_code(c))
            .collect();

        codes.extend(
            text.lines()
                .filter_map(|line| line.split_whitespace().next())
                .filter(|code| is_listed_code(code))
                .map(str::to_string),
        );

        Self { codes }
    }

    /// Universe holding only the mandatory codes.
    pub fn mandatory_only<S: AsRef<str>>(mandatory: &[S]) -> Self {
        Self::parse("", mandatory)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Provider symbols (`2330` -> `2330.TW`).
    pub fn symbols(&self) -> Vec<String> {
        self.codes
            .iter()
            .map(|c| format!("{c}{LISTED_SUFFIX}"))
            .collect()
    }
}

fn is_listed_code(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}
