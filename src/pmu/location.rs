//! Source location utilities for converting byte offsets to line/column positions
//!
//! The lexer hands out byte ranges. Diagnostics need line numbers and the text of the
//! offending line, so this module keeps the line starts of the source around and answers
//! both questions with a binary search.
//!
//! Positions are zero-based internally; errors add one when they render.

use std::fmt;
use std::ops::Range;

/// Longest line shown verbatim in a diagnostic
pub const MAX_EXCERPT: usize = 120;

/// A position in source code (line and column, both zero-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Provides fast conversion from byte offsets to line/column positions
pub struct SourceLocation<'a> {
    source: &'a str,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl<'a> SourceLocation<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];

        for (byte_pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }

        Self {
            source,
            line_starts,
        }
    }

    /// Convert a byte offset to a line/column position
    pub fn byte_to_position(&self, byte_offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);

        let column = byte_offset - self.line_starts[line];

        Position::new(line, column)
    }

    /// Text of the given zero-based line, without its line terminator.
    pub fn line_text(&self, line: usize) -> &'a str {
        let Some(&start) = self.line_starts.get(line) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.source.len());
        self.source[start..end].trim_end_matches(['\n', '\r'])
    }

    /// The lines covered by a byte range, each cut down with [`excerpt`].
    pub fn lines_of(&self, range: &Range<usize>) -> String {
        let first = self.byte_to_position(range.start).line;
        let last = self
            .byte_to_position(range.end.saturating_sub(1).max(range.start))
            .line;
        (first..=last)
            .map(|line| excerpt(self.line_text(line), 0))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cut a long line down to a window around byte `column`, marking the cuts with `...`.
///
/// Data lines routinely run to hundreds of kilobytes; diagnostics only need the
/// neighbourhood of the offending token.
pub fn excerpt(line: &str, column: usize) -> String {
    if line.len() <= MAX_EXCERPT {
        return line.to_string();
    }
    let mut start = column.saturating_sub(MAX_EXCERPT / 2).min(line.len());
    while !line.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (start + MAX_EXCERPT).min(line.len());
    while !line.is_char_boundary(end) {
        end += 1;
    }

    let mut out = String::with_capacity(end - start + 6);
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&line[start..end]);
    if end < line.len() {
        out.push_str("...");
    }
    out
}
