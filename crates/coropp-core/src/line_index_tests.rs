//! Unit tests for the line index.

use crate::line_index::{LineCol, LineIndex};

#[test]
fn single_line() {
    let idx = LineIndex::new("hello");
    assert_eq!(idx.line(0), 1);
    assert_eq!(idx.line(4), 1);
    assert_eq!(idx.line_count(), 1);
}

#[test]
fn line_starts_after_newlines() {
    let idx = LineIndex::new("ab\ncd\nef");
    assert_eq!(idx.line(0), 1);
    assert_eq!(idx.line(2), 1);
    assert_eq!(idx.line(3), 2);
    assert_eq!(idx.line(6), 3);
    assert_eq!(idx.line_col(4), LineCol { line: 2, col: 2 });
}

#[test]
fn offset_past_end_clamps() {
    let idx = LineIndex::new("ab\ncd");
    assert_eq!(idx.line(100), 2);
}

#[test]
fn empty_source() {
    let idx = LineIndex::new("");
    assert_eq!(idx.line(0), 1);
    assert_eq!(idx.line_count(), 1);
}

#[test]
fn trailing_newline_opens_new_line() {
    let idx = LineIndex::new("ab\n");
    assert_eq!(idx.line_count(), 2);
    assert_eq!(idx.line(3), 2);
}
