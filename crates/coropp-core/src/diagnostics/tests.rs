//! Unit tests for diagnostic collection and rendering.

use crate::diagnostics::Diagnostics;
use crate::span::Span;

#[test]
fn collects_errors_and_warnings() {
    let mut diags = Diagnostics::new();
    diags.error("bad keyword", Span::new(0, 5)).emit();
    diags.warning("suspicious capture", Span::new(6, 9)).emit();

    assert_eq!(diags.len(), 2);
    assert_eq!(diags.error_count(), 1);
    assert!(diags.has_errors());
}

#[test]
fn empty_collection_renders_nothing() {
    let diags = Diagnostics::new();
    assert_eq!(diags.printer().source("int x;").render(), "");
}

#[test]
fn renders_with_source_context() {
    let source = "auto f = [] resumable { yield 1; };\n";
    let mut diags = Diagnostics::new();
    let at = source.find("resumable").unwrap();
    diags
        .error(
            "resumable function used in non-inline, non-template context",
            Span::new(at, at + "resumable".len()),
        )
        .emit();

    let rendered = diags.printer().source(source).path("input.cpp").render();
    assert!(rendered.contains("error"));
    assert!(rendered.contains("input.cpp"));
    assert!(rendered.contains("non-inline"));
}

#[test]
fn plain_rendering_without_source() {
    let mut diags = Diagnostics::new();
    diags.error("cannot open include", Span::new(3, 7)).emit();
    let rendered = diags.printer().render();
    assert!(rendered.contains("error at 3..7: cannot open include"));
}

#[test]
fn related_locations_are_attached() {
    let source = "yield a;\nyield b;\n";
    let mut diags = Diagnostics::new();
    diags
        .error("duplicate yield id", Span::new(0, 7))
        .related("first allocated here", Span::new(9, 16))
        .emit();
    let rendered = diags.printer().source(source).render();
    assert!(rendered.contains("duplicate yield id"));
    assert!(rendered.contains("first allocated here"));
}

#[test]
fn extend_merges_collections() {
    let mut a = Diagnostics::new();
    a.error("one", Span::new(0, 1)).emit();
    let mut b = Diagnostics::new();
    b.error("two", Span::new(1, 2)).emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
}
