//! Positions and ranges inside a document.
//!
//! Lines and characters are zero-based. Character offsets count Unicode
//! scalar values, not bytes.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// Converts this position to a byte offset in `text`.
    ///
    /// The position one past the last line (`line == line_count`,
    /// `character == 0`) maps to the end of the text.
    pub fn to_offset(&self, text: &str) -> Option<usize> {
        let mut line_start = 0;
        for (index, line) in text.split('\n').enumerate() {
            if index == self.line {
                let within = char_to_byte(line, self.character)?;
                return Some(line_start + within);
            }
            line_start += line.len() + 1;
        }
        (self.line == line_count(text) && self.character == 0).then_some(text.len())
    }

    /// Position reached after inserting `inserted` at `self`.
    pub fn advance(&self, inserted: &str) -> Position {
        let newlines = inserted.matches('\n').count();
        if newlines == 0 {
            Position::new(self.line, self.character + inserted.chars().count())
        } else {
            let tail = inserted.rsplit('\n').next().unwrap_or("");
            Position::new(self.line + newlines, tail.chars().count())
        }
    }
}

/// A half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `position` (an insertion point).
    pub fn caret(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Parses a 1-based inclusive `"start-end"` line spec into a range
    /// spanning those full lines. A bare `"n"` selects a single line.
    pub fn from_line_spec(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (start, end) = match spec.split_once('-') {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (spec, spec),
        };
        let start: usize = start.parse().ok()?;
        let end: usize = end.parse().ok()?;
        if start == 0 || end < start {
            return None;
        }
        Some(Self::new(Position::new(start - 1, 0), Position::new(end, 0)))
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Converts to a byte range within `text`, or `None` if out of bounds.
    pub fn to_byte_range(&self, text: &str) -> Option<Range<usize>> {
        let start = self.start.to_offset(text)?;
        let end = self.end.to_offset(text)?;
        (start <= end).then_some(start..end)
    }

    /// Returns true if the range lies inside a document of `line_count` lines.
    pub fn fits_line_count(&self, line_count: usize) -> bool {
        self.start <= self.end && self.end.line <= line_count
    }
}

/// Number of lines in `text` (an empty text has one empty line).
pub fn line_count(text: &str) -> usize {
    text.matches('\n').count() + 1
}

fn char_to_byte(line: &str, character: usize) -> Option<usize> {
    if character == 0 {
        return Some(0);
    }
    match line.char_indices().nth(character) {
        Some((offset, _)) => Some(offset),
        None if line.chars().count() == character => Some(line.len()),
        None => None,
    }
}
