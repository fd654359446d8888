//! Yield-site expansions.
//!
//! Every suspension lowers to the switch-within-control-flow pattern: the
//! statement is wrapped in a `do { ... } while (false)` whose `case` label
//! is reachable only through the dispatcher's switch, never by falling
//! through from the preceding code.

use coropp_core::Rewriter;

use crate::Result;
use crate::analyze::model::{LambdaModel, SubGen, YieldId, YieldKind, YieldPoint};
use crate::codegen::default_return;

pub fn expand_yields(model: &LambdaModel, rewriter: &mut Rewriter) -> Result<()> {
    for y in &model.yields {
        let text = match &y.kind {
            // The analyzer already rewrote declaration statements in place.
            YieldKind::LocalInit { .. } | YieldKind::SubLive { .. } => continue,
            YieldKind::Value { expr } => value_yield(y.id, expr),
            YieldKind::Suspend => suspend_yield(y.id),
            YieldKind::Delegate { sub } => delegate(y, sub),
            YieldKind::TailDelegate { sub } => tail_delegate(model, y, sub),
        };
        rewriter.replace(y.stmt_span, text)?;
    }
    Ok(())
}

/// `yield E` - suspend at `id`, hand `E` to the caller, resume after.
fn value_yield(id: YieldId, expr: &str) -> String {
    let mut out = String::from("do {\n");
    out.push_str(&format!("        __state_ = {id};\n"));
    out.push_str("        __unwinder.__this_ = 0;\n");
    out.push_str(&format!("        return {expr};\n"));
    out.push_str(&format!("      case {id}: ;\n"));
    out.push_str("      } while (false);");
    out
}

/// `break_resumable` / `co_yield` - suspend with no value.
fn suspend_yield(id: YieldId) -> String {
    let mut out = String::from("do {\n");
    out.push_str(&format!("        __state_ = {id};\n"));
    out.push_str("        __unwinder.__this_ = 0;\n");
    out.push_str("        return;\n");
    out.push_str(&format!("      case {id}: ;\n"));
    out.push_str("      } while (false);");
    out
}

/// `yield from G` - drain the sub-generator, yielding each value (including
/// the one produced by its terminal transition), then fall through to the
/// statement after the delegation. Materialized storage stays live until
/// its scope unwinds, like any other local.
fn delegate(y: &YieldPoint, sub: &SubGen) -> String {
    let g = &sub.expr;
    let id = y.id;
    let mut out = String::from("do {\n");
    push_materialize(&mut out, sub);
    out.push_str(&format!("      case {id}: ;\n"));
    out.push_str(&format!("        while (!::is_terminal({g}))\n"));
    out.push_str("        {\n");
    out.push_str(&format!("          __state_ = {id};\n"));
    out.push_str(&format!(
        "          return ::__co_yield_sub(__unwinder, {g});\n"
    ));
    out.push_str("        }\n");
    out.push_str("      } while (false);");
    out
}

/// `return from G` - same loop, but the machine goes terminal with the
/// sub-generator; its final value is the machine's final value.
fn tail_delegate(model: &LambdaModel, y: &YieldPoint, sub: &SubGen) -> String {
    let g = &sub.expr;
    let id = y.id;
    let mut out = String::from("do {\n");
    push_materialize(&mut out, sub);
    out.push_str(&format!("      case {id}: ;\n"));
    out.push_str(&format!("        while (!::is_terminal({g}))\n"));
    out.push_str("        {\n");
    out.push_str(&format!(
        "          return ::__co_return_sub(__unwinder, {g}, {id});\n"
    ));
    out.push_str("        }\n");
    out.push_str("        __unwind_to(-1);\n");
    out.push_str(&format!("        {}\n", default_return(model)));
    out.push_str("      } while (false);");
    out
}

/// Construction of a materialized sub-generator plus the extra case label
/// that catches the state in which the synthesized local is live.
fn push_materialize(out: &mut String, sub: &SubGen) {
    let (Some(live), Some(init)) = (sub.live_yield, sub.init.as_ref()) else {
        return;
    };
    let g = &sub.expr;
    out.push_str(&format!("        ::__co_new(&{g}, {init});\n"));
    out.push_str(&format!("        __state_ = {live};\n"));
    out.push_str(&format!("      case {live}: ;\n"));
}
