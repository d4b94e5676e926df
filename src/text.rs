//! Positions, ranges and byte-offset conversion for document text.
//!
//! Lines and characters are 0-based. A character is one Unicode scalar value,
//! so columns stay stable regardless of how many bytes a glyph needs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.character.cmp(&other.character))
    }
}

/// Half-open span `[start, end)` in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True when `other` lies entirely within `self` (equal ranges included).
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Line-start table for one document.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Byte offset to position. Offsets past the end clamp to the end.
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let mut end = offset;
        while end > line_start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let character = text[line_start..end].chars().count();
        Position::new(line as u32, character as u32)
    }

    /// Position to byte offset, clamping past-the-end lines and columns.
    pub fn offset(&self, text: &str, pos: Position) -> usize {
        let line = pos.line as usize;
        if line >= self.line_starts.len() {
            return self.len;
        }
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        let line_text = &text[line_start..line_end];
        match line_text.char_indices().nth(pos.character as usize) {
            Some((byte, _)) => line_start + byte,
            None => line_end,
        }
    }

    pub fn range(&self, text: &str, start: usize, end: usize) -> Range {
        Range::new(self.position(text, start), self.position(text, end))
    }

    /// Byte bounds of `range`, ordered and clamped to the document.
    pub fn byte_span(&self, text: &str, range: &Range) -> (usize, usize) {
        let start = self.offset(text, range.start);
        let end = self.offset(text, range.end).max(start);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_roundtrip_through_offsets() {
        let text = "fn a() {\n    b();\n}\n";
        let index = LineIndex::new(text);
        let offset = text.find("b()").unwrap();
        let pos = index.position(text, offset);
        assert_eq!(pos, Position::new(1, 4));
        assert_eq!(index.offset(text, pos), offset);
    }

    #[test]
    fn characters_count_scalar_values() {
        let text = "let é = call();";
        let index = LineIndex::new(text);
        let offset = text.find("call").unwrap();
        assert_eq!(index.position(text, offset), Position::new(0, 8));
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let text = "one\ntwo";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(text, Position::new(9, 0)), text.len());
        assert_eq!(index.offset(text, Position::new(0, 99)), 3);
    }

    #[test]
    fn range_relations() {
        let outer = Range::new(Position::new(0, 0), Position::new(10, 0));
        let inner = Range::new(Position::new(2, 4), Position::new(2, 8));
        assert!(outer.contains_range(&inner));
        assert!(!inner.contains_range(&outer));
        assert!(outer.intersects(&inner));
        assert!(outer.contains(Position::new(2, 5)));
        assert!(!inner.contains(Position::new(2, 8)));
    }
}
