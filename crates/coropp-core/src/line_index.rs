//! Offset to line/column conversion.
//!
//! Built once per source buffer; lookups binary-search the newline table.
//! Lines and columns are 1-based, matching `#line` directives and the
//! conventions of compiler diagnostics.

/// 1-based line/column position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

/// Precomputed newline table for one source buffer.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line. `line_starts[0] == 0`.
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// 1-based line number containing `offset`. Offsets past the end clamp
    /// to the last line.
    pub fn line(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// 1-based line and column (column in bytes) of `offset`.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let line = self.line(offset);
        let line_start = self.line_starts[line - 1];
        LineCol {
            line,
            col: offset.min(self.len) - line_start + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
