//! Shared helpers for pipeline tests.

use std::path::Path;

use crate::{Options, TranslateOutput, translate_source};

/// Translate in-memory source with default options; panics on failure.
pub fn translate(source: &str) -> TranslateOutput {
    translate_source(source, "input.cpp", Path::new("."), &Options::default())
        .expect("translation failed")
}

/// Translate with `#line` directives enabled.
pub fn translate_with_lines(source: &str) -> TranslateOutput {
    let options = Options {
        line_directives: true,
        ..Options::default()
    };
    translate_source(source, "input.cpp", Path::new("."), &options)
        .expect("translation failed")
}
