//! coropp translator: lowers resumable lambdas to state-machine objects.
//!
//! Pipeline over one translation unit:
//! - `lexer` / `encode` - keyword recognition and parse-legal encoding
//! - `lang` - the host parser (tree-sitter C++) as a syntax tree oracle
//! - `sandbox` - include-closure validation for `-p`
//! - `oracle` - reachability pre-pass over the static call graph
//! - `analyze` - per-lambda scope/yield/local model, analyzer-stage rewrites
//! - `codegen` - state-machine struct emission through the rewriter
//! - `preamble` - the runtime trait-helper header

pub mod analyze;
pub mod codegen;
pub mod encode;
pub mod lang;
pub mod lexer;
pub mod oracle;
pub mod preamble;
pub mod sandbox;

#[cfg(test)]
mod encode_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod sandbox_tests;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod translate_tests;

use std::path::{Path, PathBuf};

use coropp_core::{Diagnostics, LineIndex, Rewriter, RewriteError, Span};

use crate::codegen::CodegenOptions;
use crate::sandbox::{Sandbox, SandboxError};

/// Errors that abort a translation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read input '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The host parser rejected the input; the collected diagnostics carry
    /// the locations.
    #[error("input rejected by the host parser")]
    ParseFailed(Diagnostics),

    /// A resumable construct in a context that cannot host the transform.
    #[error("resumable function used in non-inline, non-template context")]
    ResumableContext(Diagnostics),

    /// An unresolvable or conflicting source range - the macro-expansion
    /// anomaly of the original tool; always a translator bug or an
    /// unsupported construct.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("analysis failed: {0}")]
    Analyze(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-run settings; the process-wide context of the translator.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Dump the host syntax tree to stderr.
    pub verbose: bool,
    /// Emit `#line` directives against the original source.
    pub line_directives: bool,
    /// Sandbox prefix for transitively included files.
    pub sandbox_dir: Option<PathBuf>,
}

/// Result of translating one unit.
#[derive(Debug)]
pub struct TranslateOutput {
    /// The rewritten translation unit, preamble included.
    pub output: String,
    /// Files entered while scanning the include closure, for `-v` logs.
    pub entered_files: Vec<PathBuf>,
    /// Host syntax tree dump when verbose.
    pub tree_dump: Option<String>,
    /// Number of lambdas lowered.
    pub lambda_count: u32,
}

/// Translate the translation unit at `path`.
pub fn translate_file(path: &Path, options: &Options) -> Result<TranslateOutput> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let display = path.display().to_string();
    translate_source(&source, &display, &dir, options)
}

/// Translate in-memory source; `input_name` feeds diagnostics and `#line`
/// directives, `input_dir` anchors quoted includes.
pub fn translate_source(
    source: &str,
    input_name: &str,
    input_dir: &Path,
    options: &Options,
) -> Result<TranslateOutput> {
    // Re-running on our own output must be a no-op apart from passing the
    // text through: the runtime preamble is injected exactly once.
    let preamble_needed = !preamble::already_injected(source);

    // Keyword encoding happens before the host parser sees the input.
    let encoded = encode::encode(source);
    let text = encoded.text.as_str();

    // Sandbox closure over quoted includes.
    let mut entered_files = Vec::new();
    let sandbox = match &options.sandbox_dir {
        Some(dir) => Some(Sandbox::new(dir)?),
        None => None,
    };
    if sandbox.is_some() || options.verbose {
        sandbox::scan_closure(text, input_dir, sandbox.as_ref(), &mut entered_files)?;
    }

    // Host parse. Error nodes surface as diagnostics without recovery.
    let tree = lang::parse(text);
    let error_spans = lang::parse_error_spans(&tree);
    if !error_spans.is_empty() {
        let mut diagnostics = Diagnostics::new();
        for span in error_spans {
            diagnostics.error("syntax error", span).emit();
        }
        return Err(Error::ParseFailed(diagnostics));
    }

    // Reachability pre-pass.
    let mut diagnostics = Diagnostics::new();
    let _oracle = oracle::run(&tree, text, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(Error::ResumableContext(diagnostics));
    }

    // Lower each resumable lambda, in source order.
    let mut rewriter = Rewriter::new(text);
    let lines = LineIndex::new(text);
    let codegen_opts = CodegenOptions {
        line_directives: options.line_directives,
        input_path: input_name.to_string(),
    };

    let mut lambda_count = 0u32;
    for node in lang::descendants(tree.root_node()) {
        if node.kind() != "lambda_expression" {
            continue;
        }
        if !is_marked_resumable(node, &encoded.resumable_markers) {
            continue;
        }
        let model = analyze::analyze(node, text, &mut rewriter, lambda_count)?;
        codegen::generate(&model, &mut rewriter, &lines, &codegen_opts)?;
        lambda_count += 1;
    }

    let mut output = String::new();
    if preamble_needed {
        output.push_str(preamble::runtime_preamble());
        if options.line_directives {
            output.push_str(&preamble::line_directive(1, input_name));
        }
    }
    output.push_str(&rewriter.finish());

    Ok(TranslateOutput {
        output,
        entered_files,
        tree_dump: options.verbose.then(|| lang::dump_tree(&tree, text)),
        lambda_count,
    })
}

/// A lambda is resumable when a `resumable` marker landed in its declarator
/// region - after the capture list, before the body.
fn is_marked_resumable(
    lambda: arborium_tree_sitter::Node<'_>,
    markers: &[usize],
) -> bool {
    let Some(body) = lambda.child_by_field_name("body") else {
        return false;
    };
    let declarator_region = declarator_region(lambda, body);
    markers
        .iter()
        .any(|&offset| declarator_region.start() <= offset && offset < declarator_region.end())
}

fn declarator_region(
    lambda: arborium_tree_sitter::Node<'_>,
    body: arborium_tree_sitter::Node<'_>,
) -> Span {
    let captures_end = lambda
        .child_by_field_name("captures")
        .map(|c| c.end_byte())
        .unwrap_or(lambda.start_byte());
    Span::new(captures_end, body.start_byte())
}
