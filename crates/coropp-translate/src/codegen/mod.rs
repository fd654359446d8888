//! Code generation for resumable lambdas.
//!
//! Consumes the analyzer's model and replaces the original lambda
//! expression with an immediately-invoked lambda that defines the
//! state-machine struct and returns a factory for it:
//!
//! - `dispatch` - yield-site expansions threaded through the kept body text
//! - `struct_gen` - the generated struct, factory and invocation around it
//!
//! Generator rewrites run after the analyzer's, and quote text the analyzer
//! already rewrote.

mod dispatch;
mod struct_gen;


use coropp_core::{LineIndex, Rewriter, Span};

use crate::Result;
use crate::analyze::model::LambdaModel;

/// Per-run emission settings.
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Emit `#line` directives pointing at the original source.
    pub line_directives: bool,
    /// Path quoted into the directives.
    pub input_path: String,
}

/// Replace one resumable lambda with its generated state machine.
pub fn generate(
    model: &LambdaModel,
    rewriter: &mut Rewriter,
    lines: &LineIndex,
    opts: &CodegenOptions,
) -> Result<()> {
    dispatch::expand_yields(model, rewriter)?;

    let mut stage1 = struct_gen::stage1_text(model);
    let mut stage2 = struct_gen::stage2_text(model);

    if opts.line_directives {
        let lambda_line = lines.line(model.replace_span.start());
        let body_line = lines.line(model.body_span.start());
        let after_line = lines.line(model.replace_span.end());
        let path = &opts.input_path;
        stage1 = format!(
            "\n#line {lambda_line} \"{path}\"\n{stage1}\n#line {body_line} \"{path}\"\n"
        );
        stage2 = format!("{stage2}\n#line {after_line} \"{path}\"\n");
    }

    let stage1_span = Span::new(model.replace_span.start(), model.body_span.start());
    let stage2_span = Span::new(model.body_span.end(), model.replace_span.end());
    rewriter.replace(stage1_span, stage1)?;
    rewriter.replace(stage2_span, stage2)?;
    Ok(())
}

/// Result statement for dispatcher epilogues, which sit past the terminal
/// checks and never execute. The unreachable sentinel keeps result types
/// free of a default-constructibility demand (a machine can return a type
/// with no default constructor).
///
/// With an explicit return type the spelling is direct; for a deduced
/// return the first value-producing expression's decayed decltype stands in
/// (there is no expression to deduce from when the lambda never yields a
/// value, so the machine is void and a bare `return` suffices).
pub(crate) fn default_return(model: &LambdaModel) -> String {
    match (&model.return_type, &model.first_value_expr) {
        (Some(ty), _) if ty == "void" => "return;".to_string(),
        (Some(ty), _) => format!("return ::__co_terminal_result<{ty}>();"),
        (None, Some(expr)) => format!(
            "return ::__co_terminal_result< ::std::decay<decltype(({expr}))>::type >();"
        ),
        (None, None) => "return;".to_string(),
    }
}
