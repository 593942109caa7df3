//! Source positions shared by tokens, AST nodes and diagnostics.
//!
//! Every token carries a [`Position`] (1-based line, 0-based column, and the
//! byte offset `codespan-reporting` needs for its labels). AST nodes reuse
//! the position of the token they were built from rather than re-deriving it
//! later, so a span is an owned value that outlives the original source
//! borrow once parsing finishes.

use std::ops::Range;

use crate::file::SourceFile;

/// A 1-based line, 0-based column position plus the underlying byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// A position plus the source file it belongs to, and the byte length of the
/// lexeme/node it marks. This is what diagnostics ultimately render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: SourceFile,
    pub position: Position,
    pub len: usize,
}

impl Span {
    pub fn new(file: SourceFile, position: Position, len: usize) -> Self {
        Self { file, position, len }
    }

    pub fn range(&self) -> Range<usize> {
        self.position.offset..self.position.offset + self.len
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Combines two spans (assumed to be from the same file) into one
    /// spanning from the start of `self` to the end of `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let start = self.position.offset.min(other.position.offset);
        let end = (self.position.offset + self.len).max(other.position.offset + other.len);
        let position = if self.position.offset <= other.position.offset { self.position } else { other.position };
        Span {
            file: self.file.clone(),
            position,
            len: end - start,
        }
    }
}
