//! Buffered source rewriter.
//!
//! All textual changes to the translation unit go through one `Rewriter`,
//! addressed by byte spans into the original buffer. Edits are queued and
//! applied only when the final buffer is requested, so earlier passes can
//! still read back the rewritten text of a range (`text_for`) before a later
//! pass replaces that whole range.
//!
//! Ordering rules:
//! - a replacement subsumes edits that lie strictly inside its span (their
//!   text has already been read back and quoted by the caller);
//! - insertions anchored exactly at a replacement's boundaries survive it;
//! - partial overlap between replacements is a hard error - it indicates two
//!   passes disagreeing about statement extents, which is a translator bug.

use thiserror::Error;

use crate::span::Span;

/// Fatal rewriter failures. These correspond to unresolvable source ranges;
/// the pipeline treats them as internal errors, not user diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("edit range {0:?} is outside the source buffer")]
    OutOfBounds(Span),

    #[error("edit range {0:?} partially overlaps an earlier edit at {1:?}")]
    Conflict(Span, Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EditKind {
    /// Insertion anchored before any original text at the offset.
    InsertBefore,
    /// Insertion anchored after the original text ending at the offset.
    InsertAfter,
    /// Replacement of a non-empty (or empty) range.
    Replace,
}

#[derive(Debug, Clone)]
struct Edit {
    span: Span,
    kind: EditKind,
    text: String,
    /// Submission order; stabilizes same-anchor edits.
    seq: usize,
}

impl Edit {
    fn sort_key(&self) -> (usize, EditKind, usize) {
        (self.span.start(), self.kind, self.seq)
    }
}

/// Buffered rewriter over one source buffer.
#[derive(Debug, Clone)]
pub struct Rewriter {
    source: String,
    edits: Vec<Edit>,
    next_seq: usize,
}

impl Rewriter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            edits: Vec::new(),
            next_seq: 0,
        }
    }

    /// The untouched source buffer.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace `span` with `text`. Subsumes edits strictly inside `span`.
    pub fn replace(
        &mut self,
        span: Span,
        text: impl Into<String>,
    ) -> Result<(), RewriteError> {
        self.check_bounds(span)?;

        // Conflict check against surviving replacements before subsumption,
        // so a partial overlap is reported rather than silently clipped.
        for e in &self.edits {
            if e.kind == EditKind::Replace
                && e.span.overlaps(span)
                && !span.contains(e.span)
                && !e.span.contains(span)
            {
                return Err(RewriteError::Conflict(span, e.span));
            }
            if e.kind == EditKind::Replace && e.span.contains(span) && e.span != span {
                // A larger replacement already owns this region.
                return Err(RewriteError::Conflict(span, e.span));
            }
        }

        self.edits.retain(|e| !subsumed_by(span, e));
        self.push(span, EditKind::Replace, text.into());
        Ok(())
    }

    /// Insert `text` before the original content at `offset`.
    pub fn insert_before(
        &mut self,
        offset: usize,
        text: impl Into<String>,
    ) -> Result<(), RewriteError> {
        let span = Span::empty(offset);
        self.check_bounds(span)?;
        self.push(span, EditKind::InsertBefore, text.into());
        Ok(())
    }

    /// Insert `text` after the original content ending at `offset`.
    ///
    /// Use the end offset of the preceding token; relative to other edits at
    /// the same offset this sorts after `insert_before` text.
    pub fn insert_after(
        &mut self,
        offset: usize,
        text: impl Into<String>,
    ) -> Result<(), RewriteError> {
        let span = Span::empty(offset);
        self.check_bounds(span)?;
        self.push(span, EditKind::InsertAfter, text.into());
        Ok(())
    }

    /// Read back the current (rewritten) text of `span`.
    ///
    /// Fails if an edit straddles the window boundary - callers always quote
    /// ranges that fully contain their own edits.
    pub fn text_for(&self, span: Span) -> Result<String, RewriteError> {
        self.check_bounds(span)?;
        for e in &self.edits {
            if e.span.overlaps(span) && !span.contains(e.span) {
                return Err(RewriteError::Conflict(span, e.span));
            }
        }
        Ok(self.render(span))
    }

    /// Apply every queued edit and return the final buffer.
    pub fn finish(self) -> String {
        self.render(Span::new(0, self.source.len()))
    }

    fn render(&self, window: Span) -> String {
        let mut edits: Vec<&Edit> = self
            .edits
            .iter()
            .filter(|e| window.contains(e.span))
            .collect();
        edits.sort_by_key(|e| e.sort_key());

        let mut out = String::with_capacity(window.len());
        let mut cursor = window.start();
        for e in edits {
            if e.span.start() > cursor {
                out.push_str(&self.source[cursor..e.span.start()]);
                cursor = e.span.start();
            }
            out.push_str(&e.text);
            cursor = cursor.max(e.span.end());
        }
        out.push_str(&self.source[cursor..window.end()]);
        out
    }

    fn push(&mut self, span: Span, kind: EditKind, text: String) {
        self.edits.push(Edit {
            span,
            kind,
            text,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    fn check_bounds(&self, span: Span) -> Result<(), RewriteError> {
        if span.end() > self.source.len()
            || !self.source.is_char_boundary(span.start())
            || !self.source.is_char_boundary(span.end())
        {
            return Err(RewriteError::OutOfBounds(span));
        }
        Ok(())
    }
}

/// Whether `edit` disappears when `replacement` is applied over it.
/// Insertions pinned to the replacement's boundaries survive.
fn subsumed_by(replacement: Span, edit: &Edit) -> bool {
    if !replacement.contains(edit.span) {
        return false;
    }
    match edit.kind {
        EditKind::Replace => true,
        EditKind::InsertBefore | EditKind::InsertAfter => {
            edit.span.start() > replacement.start() && edit.span.start() < replacement.end()
        }
    }
}
