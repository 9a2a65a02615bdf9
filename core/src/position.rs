//! Source and editor coordinates
//!
//! The parser works in source coordinates ([`SourcePos`]: 1-based line,
//! 0-based column, absolute byte index). Editors work in [`LinePosition`]
//! (0-based line, 0-based character). Every conversion between the two lives
//! in this module; nothing else adds or subtracts on the line axis.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Source coordinates
// ============================================================================

/// A point in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    /// Line number (1-based)
    pub line: usize,
    /// Column (0-based, in characters)
    pub column: usize,
    /// Absolute byte offset into the document
    pub index: usize,
}

impl SourcePos {
    /// The first character of a document
    pub const START: SourcePos = SourcePos {
        line: 1,
        column: 0,
        index: 0,
    };

    pub fn new(line: usize, column: usize, index: usize) -> Self {
        debug_assert!(line >= 1, "source lines are 1-based");
        Self {
            line,
            column,
            index,
        }
    }

    /// The position reached after consuming `text` from here
    pub fn advance(self, text: &str) -> SourcePos {
        let mut pos = self;
        for ch in text.chars() {
            if ch == '\n' {
                pos.line += 1;
                pos.column = 0;
            } else {
                pos.column += 1;
            }
            pos.index += ch.len_utf8();
        }
        pos
    }

    /// Convert to editor coordinates
    pub fn to_line_position(self) -> LinePosition {
        LinePosition {
            line: self.line - 1,
            character: self.column,
        }
    }

    /// Convert from editor coordinates. The byte index is supplied by the
    /// caller since it depends on the document text.
    pub fn from_line_position(position: LinePosition, index: usize) -> SourcePos {
        SourcePos {
            line: position.line + 1,
            column: position.character,
            index,
        }
    }
}

impl PartialOrd for SourcePos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourcePos {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A span of source text
///
/// `stop` is the position just past the last character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub text: String,
    pub start: SourcePos,
    pub stop: SourcePos,
}

impl TextLocation {
    pub fn new(text: impl Into<String>, start: SourcePos, stop: SourcePos) -> Self {
        debug_assert!(stop >= start, "span stop precedes its start");
        Self {
            text: text.into(),
            start,
            stop,
        }
    }

    /// Span covering `text` starting at `start`
    pub fn of_text(text: &str, start: SourcePos) -> Self {
        Self::new(text, start, start.advance(text))
    }

    /// Whether `position` lies inside this span. The end is inclusive so a
    /// cursor placed right after the last character still belongs to it.
    pub fn contains(&self, position: LinePosition) -> bool {
        self.start.to_line_position() <= position && position <= self.stop.to_line_position()
    }

    /// Whether `position` lies strictly inside, excluding the end point
    pub fn contains_exclusive(&self, position: LinePosition) -> bool {
        self.start.to_line_position() <= position && position < self.stop.to_line_position()
    }

    /// Whether the whole span ends before `position`
    pub fn ends_before(&self, position: LinePosition) -> bool {
        self.stop.to_line_position() < position
    }

    /// Whether the span starts at or before `position`
    pub fn starts_at_or_before(&self, position: LinePosition) -> bool {
        self.start.to_line_position() <= position
    }

    pub fn range(&self) -> TextRange {
        TextRange {
            start: self.start.to_line_position(),
            end: self.stop.to_line_position(),
        }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.stop)
    }
}

// ============================================================================
// Editor coordinates
// ============================================================================

/// A cursor position as editors report it: 0-based line and character
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct LinePosition {
    pub line: usize,
    pub character: usize,
}

impl LinePosition {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// The position just past the end of `text`
    pub fn end_of(text: &str) -> LinePosition {
        SourcePos::START.advance(text).to_line_position()
    }

    /// Byte offset of this position in `text`, clamped to the end of its line
    /// (and to the end of `text` for lines past the last one)
    pub fn offset_in(self, text: &str) -> usize {
        let mut line_start = 0;
        for _ in 0..self.line {
            match text[line_start..].find('\n') {
                Some(newline) => line_start += newline + 1,
                None => return text.len(),
            }
        }
        let line = &text[line_start..];
        let line = &line[..line.find('\n').unwrap_or(line.len())];
        let column = line
            .char_indices()
            .nth(self.character)
            .map_or(line.len(), |(offset, _)| offset);
        line_start + column
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.character)
    }
}

/// An editor range; end-exclusive for replace ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start: LinePosition,
    pub end: LinePosition,
}

impl TextRange {
    pub fn new(start: LinePosition, end: LinePosition) -> Self {
        Self { start, end }
    }

    /// Range covering a whole document
    pub fn whole_document(text: &str) -> Self {
        Self {
            start: LinePosition::default(),
            end: LinePosition::end_of(text),
        }
    }

    /// Empty range at `position`
    pub fn at(position: LinePosition) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_axis_offset_is_one() {
        let pos = SourcePos::new(3, 7, 42);
        let editor = pos.to_line_position();
        assert_eq!(editor, LinePosition::new(2, 7));
        assert_eq!(SourcePos::from_line_position(editor, 42), pos);
    }

    #[test]
    fn test_offset_in_text() {
        let text = "ab\ncdé\nf";
        assert_eq!(LinePosition::new(0, 1).offset_in(text), 1);
        assert_eq!(LinePosition::new(1, 0).offset_in(text), 3);
        assert_eq!(LinePosition::new(1, 3).offset_in(text), 7);
        assert_eq!(LinePosition::new(1, 40).offset_in(text), 7);
        assert_eq!(LinePosition::new(9, 0).offset_in(text), text.len());
    }

    #[test]
    fn test_advance_over_newlines() {
        let end = SourcePos::START.advance("ab\ncd");
        assert_eq!(end, SourcePos::new(2, 2, 5));
    }

    #[test]
    fn test_contains_is_end_inclusive() {
        let location = TextLocation::of_text("Print", SourcePos::START);
        assert!(location.contains(LinePosition::new(0, 0)));
        assert!(location.contains(LinePosition::new(0, 5)));
        assert!(!location.contains(LinePosition::new(0, 6)));
        assert!(!location.contains_exclusive(LinePosition::new(0, 5)));
    }

    #[test]
    fn test_containment_is_monotonic_within_a_token() {
        let start = SourcePos::new(2, 4, 10);
        let location = TextLocation::of_text("Value", start);
        let inside: Vec<bool> = (4..=9)
            .map(|c| location.contains(LinePosition::new(1, c)))
            .collect();
        assert!(inside.iter().all(|b| *b));
    }

    #[test]
    fn test_end_of_document() {
        assert_eq!(LinePosition::end_of(""), LinePosition::new(0, 0));
        assert_eq!(LinePosition::end_of("a\nbc"), LinePosition::new(1, 2));
    }
}
