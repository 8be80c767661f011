//! Package `Description` fields.
//!
//! A description is built from short fragments, joined with `", "` on the
//! synopsis line, and long paragraphs that are re-wrapped to 74 columns in
//! the extended description.

use crate::error::Result;
use std::fmt;

const WRAP_WIDTH: usize = 74;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescription {
    short: Vec<String>,
    long: Vec<String>,
}

impl PackageDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a field value: the first line is the synopsis, the rest is the
    /// extended description with paragraphs separated by `.` lines.
    pub fn parse(value: &str) -> Self {
        let mut desc = Self::new();
        match value.split_once('\n') {
            Some((short, long)) => {
                desc.append_short(short);
                desc.append(long);
            }
            None => desc.append_short(value),
        }
        desc
    }

    /// Add long text; it may hold several paragraphs separated by `\n.\n`.
    pub fn append(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.long.extend(text.split("\n.\n").map(String::from));
        }
    }

    /// Add comma-separated synopsis fragments, ignoring empty ones.
    pub fn append_short(&mut self, text: &str) {
        self.short.extend(
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
    }

    pub fn extend(&mut self, other: &PackageDescription) {
        self.short.extend(other.short.iter().cloned());
        self.long.extend(other.long.iter().cloned());
    }

    pub fn short(&self) -> &[String] {
        &self.short
    }

    pub fn long(&self) -> &[String] {
        &self.long
    }

    pub fn is_empty(&self) -> bool {
        self.short.is_empty() && self.long.is_empty()
    }

    /// Apply `f` to every fragment and paragraph.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(Self {
            short: self.short.iter().map(|s| f(s)).collect::<Result<_>>()?,
            long: self.long.iter().map(|s| f(s)).collect::<Result<_>>()?,
        })
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if current_width > 0 && current_width + 1 + word_width > width {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if current_width > 0 {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

impl fmt::Display for PackageDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short.join(", "))?;
        let paragraphs: Vec<String> = self
            .long
            .iter()
            .map(|p| wrap(p, WRAP_WIDTH).join("\n "))
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            write!(f, "\n {}", paragraphs.join("\n .\n "))?;
        }
        Ok(())
    }
}
