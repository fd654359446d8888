//! Emission of the generated state-machine struct, its factory, and the
//! immediately-invoked lambda bracketing them.
//!
//! Stage 1 replaces everything from the opening of the original lambda up
//! to its body's first brace; stage 2 replaces everything from the body's
//! closing brace to the end of the lambda. The body text in between was
//! already rewritten by the analyzer and the dispatcher.

use crate::analyze::model::{CaptureForm, LambdaModel, Local, YieldId, YieldKind};
use crate::codegen::default_return;

pub fn stage1_text(model: &LambdaModel) -> String {
    let name = model.struct_name();
    let mut out = String::new();

    out.push_str("/*BEGIN RESUMABLE LAMBDA DEFINITION*/\n");
    out.push_str("[&]{\n");
    push_capture_aliases(&mut out, model);
    push_sub_aliases(&mut out, model);

    let copy_conj = conjunction("__co_all_copy_constructible", model);
    let move_conj = conjunction("__co_all_move_constructible", model);

    out.push_str(&format!("  struct {name}\n  {{\n"));
    push_captures_struct(&mut out, model);
    push_initializer_struct(&mut out, model);
    push_locals_union(&mut out, model);

    out.push_str("    __captures_t __captures_;\n");
    if !model.locals.is_empty() {
        out.push_str("    __locals_t __locals_;\n");
    }
    out.push_str("    int __state_;\n\n");

    push_capture_ctor(&mut out, model);
    push_initializer_ctor(&mut out, model);
    push_copy_ctor(&mut out, model, &copy_conj);
    push_move_ctor(&mut out, model, &move_conj);
    push_unwind(&mut out, model);
    push_unwinder_struct(&mut out, model);

    out.push_str(&format!("    ~{name}()\n    {{\n      __unwind_to(-1);\n    }}\n\n"));
    out.push_str("    bool is_initial() const noexcept\n    {\n      return __state_ == 0;\n    }\n\n");
    out.push_str("    bool is_terminal() const noexcept\n    {\n      return __state_ == -1;\n    }\n\n");
    push_wanted_members(&mut out, model);

    push_call_operator_open(&mut out, model);
    out
}

pub fn stage2_text(model: &LambdaModel) -> String {
    let name = model.struct_name();
    let factory = model.factory_name();
    let mut out = String::new();

    // Close the dispatcher switch, then the terminal epilogue: execution
    // past the body means the coroutine finished.
    out.push_str("\n      }\n");
    out.push_str("      __unwind_to(-1);\n");
    out.push_str(&format!("      {}\n", default_return(model)));
    out.push_str("    }\n");
    out.push_str("  };\n\n");

    // Factory: accepts the capture values and builds the machine (or its
    // initializer holder) at the call site.
    let result = if model.as_initializer {
        format!("{name}::__initializer")
    } else {
        name.clone()
    };
    out.push_str(&format!("  struct {factory}\n  {{\n"));
    out.push_str(&format!(
        "    {result} operator(){} const\n    {{\n",
        ctor_param_list(model)
    ));
    if model.as_initializer {
        out.push_str(&format!(
            "      return {name}::__initializer({name}::__captures_t({}));\n",
            forwarded_args(model)
        ));
    } else {
        out.push_str(&format!("      return {name}({});\n", forwarded_args(model)));
    }
    out.push_str("    }\n  };\n\n");

    out.push_str(&format!("  return {factory}();\n"));
    out.push_str(&format!("}}({})", invocation_args(model)));
    out.push_str("\n/*END RESUMABLE LAMBDA DEFINITION*/");
    out
}

/// Transported-type aliases, at the immediately-invoked lambda's scope so
/// `decltype` still sees the enclosing names (including the enclosing
/// `this`).
fn push_capture_aliases(out: &mut String, model: &LambdaModel) {
    for (i, c) in model.captures.iter().enumerate() {
        let alias = c.alias(i);
        let expr = match (&c.form, &c.name) {
            (CaptureForm::Init { initializer }, _) => initializer.clone(),
            (CaptureForm::This, _) => "this".to_string(),
            (_, Some(name)) => name.clone(),
            _ => continue,
        };
        out.push_str(&format!("  typedef decltype({expr}) {alias};\n"));
    }
    if !model.captures.is_empty() {
        out.push('\n');
    }
}

/// Storage aliases for materialized sub-generators.
fn push_sub_aliases(out: &mut String, model: &LambdaModel) {
    for (alias, expr) in &model.sub_aliases {
        out.push_str(&format!("  typedef {expr} {alias};\n"));
    }
    if !model.sub_aliases.is_empty() {
        out.push('\n');
    }
}

fn push_captures_struct(out: &mut String, model: &LambdaModel) {
    out.push_str("    struct __captures_t\n    {\n");
    for (i, c) in model.captures.iter().enumerate() {
        let alias = c.alias(i);
        let member = c.member();
        match c.form {
            CaptureForm::ByRef => out.push_str(&format!("      {alias}& {member};\n")),
            _ => out.push_str(&format!("      {alias} {member};\n")),
        }
    }
    // Move-or-copy each transported value in.
    out.push_str(&format!("      explicit __captures_t({})", ctor_param_list(model)));
    if model.captures.is_empty() {
        out.push_str("\n      {\n      }\n");
    } else {
        out.push_str("\n        : ");
        let inits: Vec<String> = model
            .captures
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let member = c.member();
                let alias = c.alias(i);
                match c.form {
                    CaptureForm::ByRef => format!("{member}(__a{i})"),
                    _ => format!("{member}(static_cast<{alias}&&>(__a{i}))"),
                }
            })
            .collect();
        out.push_str(&inits.join(",\n          "));
        out.push_str("\n      {\n      }\n");
    }
    out.push_str("    };\n\n");
}

/// Move-only holder of the capture record, for deferring construction of
/// the machine to its destination.
fn push_initializer_struct(out: &mut String, model: &LambdaModel) {
    let name = model.struct_name();
    out.push_str("    struct __initializer\n    {\n");
    out.push_str(&format!("      typedef {name} lambda;\n"));
    out.push_str("      __captures_t __captures_;\n");
    out.push_str(
        "      explicit __initializer(__captures_t&& __c)\n        \
         : __captures_(static_cast<__captures_t&&>(__c))\n      {\n      }\n",
    );
    out.push_str(
        "      __initializer(__initializer&& __other)\n        \
         : __captures_(static_cast<__captures_t&&>(__other.__captures_))\n      {\n      }\n",
    );
    out.push_str("    };\n\n");
}

/// The tagged union of all locals: one nesting level per scope-path
/// element, raw storage at every level.
fn push_locals_union(out: &mut String, model: &LambdaModel) {
    if model.locals.is_empty() {
        return;
    }
    let tree = UnionNode::build(model);
    tree.emit(out, "__locals_t", None, 2);
    out.push('\n');
}

#[derive(Default)]
struct UnionNode<'m> {
    fields: Vec<&'m Local>,
    children: Vec<(u32, UnionNode<'m>)>,
}

impl<'m> UnionNode<'m> {
    fn build(model: &'m LambdaModel) -> UnionNode<'m> {
        let mut root = UnionNode::default();
        for local in &model.locals {
            let path = model.scope_path(local.scope);
            root.insert(&path, local);
        }
        root
    }

    fn insert(&mut self, path: &[u32], local: &'m Local) {
        match path.split_first() {
            None => self.fields.push(local),
            Some((&head, rest)) => {
                if let Some((_, child)) =
                    self.children.iter_mut().find(|(id, _)| *id == head)
                {
                    child.insert(rest, local);
                } else {
                    let mut child = UnionNode::default();
                    child.insert(rest, local);
                    self.children.push((head, child));
                }
            }
        }
    }

    fn emit(&self, out: &mut String, type_name: &str, member: Option<&str>, depth: usize) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{pad}union {type_name}\n{pad}{{\n"));
        out.push_str(&format!("{pad}  {type_name}() {{}}\n"));
        out.push_str(&format!("{pad}  ~{type_name}() {{}}\n"));
        for local in &self.fields {
            out.push_str(&format!("{pad}  {} {};\n", local.ty, local.name));
        }
        for (sub, child) in &self.children {
            child.emit(
                out,
                &format!("__s{sub}_t"),
                Some(&format!("__s{sub}")),
                depth + 1,
            );
        }
        match member {
            Some(m) => out.push_str(&format!("{pad}}} {m};\n")),
            None => out.push_str(&format!("{pad}}};\n")),
        }
    }
}

/// `(A __a0, B& __a1, ...)` over the capture list. The aliases live at the
/// immediately-invoked lambda's scope, so the list also works verbatim in
/// the factory.
fn ctor_param_list(model: &LambdaModel) -> String {
    let params: Vec<String> = model
        .captures
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let alias = c.alias(i);
            match c.form {
                CaptureForm::ByRef => format!("{alias}& __a{i}"),
                _ => format!("{alias} __a{i}"),
            }
        })
        .collect();
    format!("({})", params.join(", "))
}

/// Arguments forwarding the factory's parameters into the constructor.
fn forwarded_args(model: &LambdaModel) -> String {
    let args: Vec<String> = model
        .captures
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let alias = c.alias(i);
            match c.form {
                CaptureForm::ByRef => format!("__a{i}"),
                _ => format!("static_cast<{alias}&&>(__a{i})"),
            }
        })
        .collect();
    args.join(", ")
}

/// The values the surrounding scope feeds the factory invocation.
fn invocation_args(model: &LambdaModel) -> String {
    let args: Vec<String> = model
        .captures
        .iter()
        .map(|c| match (&c.form, &c.name) {
            (CaptureForm::This, _) => "this".to_string(),
            (CaptureForm::Init { initializer }, _) => initializer.clone(),
            (_, Some(name)) => name.clone(),
            _ => String::new(),
        })
        .collect();
    args.join(", ")
}

fn push_capture_ctor(out: &mut String, model: &LambdaModel) {
    let name = model.struct_name();
    out.push_str(&format!(
        "    explicit {name}{}\n      : __captures_({}),\n        __state_(0)\n    {{\n    }}\n\n",
        ctor_param_list(model),
        forwarded_args(model)
    ));
}

fn push_initializer_ctor(out: &mut String, model: &LambdaModel) {
    let name = model.struct_name();
    out.push_str(&format!(
        "    explicit {name}(__initializer&& __i)\n      \
         : __captures_(static_cast<__captures_t&&>(__i.__captures_)),\n        \
         __state_(0)\n    {{\n    }}\n\n"
    ));
}

/// `::__co_all_copy_constructible<T1, T2>::value` over the local types.
fn conjunction(trait_name: &str, model: &LambdaModel) -> String {
    let types = model.local_type_list().join(", ");
    format!("::{trait_name}<{types}>::value")
}

/// Copy construction: a real copy constructor exactly when every local is
/// copy-constructible; otherwise the parameter collapses to the disabled
/// tag and the compiler's (deleted) fallback rejects user copies. The
/// state-dependent member copies sit in a generic lambda so they are only
/// instantiated when the conjunction holds.
fn push_copy_ctor(out: &mut String, model: &LambdaModel, conj: &str) {
    let name = model.struct_name();
    out.push_str(&format!(
        "    {name}(typename ::__co_copy_arg<{name}, {conj}>::type __other)\n      \
         : __captures_(::__co_captures_arg(__other)),\n        \
         __state_(::__co_state_arg(__other))\n    {{\n"
    ));
    push_clone_locals(out, model, conj, "__co_copy_new", None);
    out.push_str("    }\n\n");
}

/// Move construction, with the moved-from machine unwound so it holds no
/// live locals afterwards.
fn push_move_ctor(out: &mut String, model: &LambdaModel, conj: &str) {
    let name = model.struct_name();
    out.push_str(&format!(
        "    {name}(typename ::__co_move_arg<{name}, {conj}>::type __other)\n      \
         : __captures_(static_cast<__captures_t&&>(::__co_captures_arg(__other))),\n        \
         __state_(::__co_state_arg(__other))\n    {{\n"
    ));
    if model.locals.is_empty() {
        out.push_str("      __other.__unwind_to(-1);\n");
    } else {
        push_clone_locals(out, model, conj, "__co_move_new", Some("__from.__unwind_to(-1);"));
    }
    out.push_str("    }\n\n");
}

/// The per-state clone switch shared by copy and move construction: the
/// locals constructed at the source's state, in construction order. The
/// generic lambda keeps the body uninstantiated when the conjunction fails.
fn push_clone_locals(
    out: &mut String,
    model: &LambdaModel,
    conj: &str,
    clone_fn: &str,
    epilogue: Option<&str>,
) {
    if model.locals.is_empty() {
        return;
    }
    out.push_str(&format!(
        "      ::__co_call_if<{conj}>(\n          [](auto& __self, auto& __from)\n          {{\n"
    ));
    out.push_str("            switch (__from.__state_)\n            {\n");
    for y in &model.yields {
        let live = model.live_locals_at(y.id);
        if live.is_empty() {
            continue;
        }
        out.push_str(&format!("            case {}:\n", y.id));
        for idx in live {
            let local = &model.locals[idx];
            let q = model.qualified(local.scope, &local.name);
            let member = q.strip_prefix("__locals_.").unwrap_or(&q);
            out.push_str(&format!(
                "              ::{clone_fn}(&__self.__locals_.{member}, __from.__locals_.{member});\n"
            ));
        }
        out.push_str("              break;\n");
    }
    out.push_str("            default:\n              break;\n");
    out.push_str("            }\n");
    if let Some(extra) = epilogue {
        out.push_str(&format!("            {extra}\n"));
    }
    out.push_str("          },\n          *this, __other);\n");
}

/// The destructor walk: drop the state toward the target, destroying the
/// local owned at each yield on the way. The prior links make this LIFO.
fn push_unwind(out: &mut String, model: &LambdaModel) {
    out.push_str("    void __unwind_to(int __new_state)\n    {\n");
    out.push_str("      while (__state_ > __new_state)\n      {\n");
    out.push_str("        switch (__state_)\n        {\n");
    for y in model.yields.iter().rev() {
        out.push_str(&format!("        case {}:\n", y.id));
        if let Some(idx) = model.local_owned_by(y.id) {
            let local = &model.locals[idx];
            let q = model.qualified(local.scope, &local.name);
            out.push_str(&format!("          ::__co_destroy(&{q});\n"));
        }
        out.push_str(&format!("          __state_ = {};\n          break;\n", y.prior));
    }
    out.push_str("        default:\n          __state_ = -1;\n          break;\n");
    out.push_str("        }\n      }\n    }\n\n");
}

fn push_unwinder_struct(out: &mut String, model: &LambdaModel) {
    let name = model.struct_name();
    out.push_str(&format!(
        "    struct __unwinder_t\n    {{\n      {name}* __this_;\n      int __target_;\n      \
         ~__unwinder_t()\n      {{\n        if (__this_)\n          \
         __this_->__unwind_to(__target_);\n      }}\n    }};\n\n"
    ));
}

/// `wanted_type`/`wanted` interrogate the active sub-generator so external
/// dispatchers can see a composed chain's current demand.
fn push_wanted_members(out: &mut String, model: &LambdaModel) {
    let delegations: Vec<(YieldId, String)> = model
        .yields
        .iter()
        .filter_map(|y| match &y.kind {
            YieldKind::Delegate { sub } | YieldKind::TailDelegate { sub } => {
                Some((y.id, sub.expr_member.clone()))
            }
            _ => None,
        })
        .collect();

    out.push_str("    const ::std::type_info& wanted_type() const noexcept\n    {\n");
    push_wanted_switch(out, &delegations, "::wanted_type", "typeid(void)");
    out.push_str("    }\n\n");

    out.push_str("    void* wanted() noexcept\n    {\n");
    push_wanted_switch(out, &delegations, "::wanted", "0");
    out.push_str("    }\n\n");

    out.push_str("    const void* wanted() const noexcept\n    {\n");
    push_wanted_switch(out, &delegations, "::wanted", "0");
    out.push_str("    }\n\n");
}

fn push_wanted_switch(
    out: &mut String,
    delegations: &[(YieldId, String)],
    forward: &str,
    fallback: &str,
) {
    if delegations.is_empty() {
        out.push_str(&format!("      return {fallback};\n"));
        return;
    }
    out.push_str("      switch (__state_)\n      {\n");
    for (id, expr) in delegations {
        out.push_str(&format!("      case {id}: return {forward}({expr});\n"));
    }
    out.push_str(&format!("      default: return {fallback};\n      }}\n"));
}

/// The call operator up to (not including) the preserved body block.
fn push_call_operator_open(out: &mut String, model: &LambdaModel) {
    let ret = match &model.return_type {
        Some(ty) => format!(" -> {ty}"),
        None => String::new(),
    };
    out.push_str(&format!("    auto operator(){}{ret}\n    {{\n", model.params));
    out.push_str("      __unwinder_t __unwinder = { this, -1 };\n");
    for c in &model.captures {
        if let Some(name) = &c.name {
            out.push_str(&format!(
                "      auto& {name} = __captures_.{name}; (void){name};\n"
            ));
        }
    }
    out.push_str("      switch (__state_)\n      {\n");
    out.push_str("      case 0:\n      default:\n");
}
