//! Diagnostics for the translator.
//!
//! Collects located messages during keyword detection, the reachability
//! pass and analysis, and renders them against the original source.

mod message;
mod printer;

#[cfg(test)]
mod tests;

use crate::span::Span;

pub use message::Severity;
pub use printer::DiagnosticsPrinter;

use message::{DiagnosticMessage, RelatedInfo};

/// Collection of diagnostic messages gathered during one run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for one diagnostic; nothing is recorded until `emit`.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            message: DiagnosticMessage::error(span, msg),
            diagnostics: self,
        }
    }

    pub fn warning(&mut self, msg: impl Into<String>, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            message: DiagnosticMessage::warning(span, msg),
            diagnostics: self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    /// Rendering builder; attach the source and path before `render`.
    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    /// Attach a secondary location to the diagnostic.
    pub fn related(mut self, msg: impl Into<String>, span: Span) -> Self {
        self.message.related.push(RelatedInfo::new(span, msg));
        self
    }

    /// Commit the diagnostic to the collection.
    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
