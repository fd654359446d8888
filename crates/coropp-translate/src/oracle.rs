//! Reachability oracle.
//!
//! Classifies functions that directly contain a suspension encoding as
//! resumable and propagates that label along reverse call edges: every
//! caller of a resumable function must itself be resumable, because the
//! state-machine transform has to be visible at each call site. The label
//! reaching a function that is neither inline nor a template is a hard
//! error.

use arborium_tree_sitter::{Node, Tree};
use indexmap::IndexMap;

use coropp_core::{Diagnostics, Span};

use crate::encode::SUSPEND_FN;
use crate::lang;

/// Facts recorded for one function definition.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    /// Span of the declarator name, for diagnostics.
    pub name_span: Span,
    /// Explicitly `inline`/`constexpr`, or implicitly inline via in-class
    /// definition.
    pub inline: bool,
    /// Inside a `template_declaration`; such definitions are dependent and
    /// skipped by propagation.
    pub template: bool,
    /// Body directly contains a suspension encoding (outside nested lambdas).
    pub has_suspension: bool,
    /// Names this function calls directly.
    pub callees: Vec<String>,
    /// Statement spans of the direct call sites, for later whole-chain
    /// transformation.
    pub call_sites: Vec<Span>,
}

/// Result of the pre-pass: resumable-labeled functions by name.
#[derive(Debug, Default)]
pub struct OracleResult {
    pub functions: IndexMap<String, FunctionInfo>,
    pub resumable: Vec<String>,
}

pub fn run(tree: &Tree, source: &str, diagnostics: &mut Diagnostics) -> OracleResult {
    let mut functions: IndexMap<String, FunctionInfo> = IndexMap::new();

    for node in lang::descendants(tree.root_node()) {
        if node.kind() != "function_definition" {
            continue;
        }
        if let Some(info) = collect_function(node, source) {
            functions.insert(info.name.clone(), info);
        }
    }

    // Seed with direct suspension users, then walk callers.
    let mut resumable: Vec<String> = functions
        .values()
        .filter(|f| f.has_suspension)
        .map(|f| f.name.clone())
        .collect();

    let mut i = 0;
    while i < resumable.len() {
        let current = resumable[i].clone();
        i += 1;

        let Some(info) = functions.get(&current) else {
            continue;
        };
        if info.template {
            // Dependent: validated per instantiation by the host compiler.
            continue;
        }
        if !info.inline {
            diagnostics
                .error(
                    "resumable function used in non-inline, non-template context",
                    info.name_span,
                )
                .emit();
            continue;
        }

        // Reverse edges: every caller inherits the label.
        let callers: Vec<String> = functions
            .values()
            .filter(|f| f.callees.iter().any(|c| c == &current))
            .map(|f| f.name.clone())
            .collect();
        for caller in callers {
            if !resumable.contains(&caller) {
                resumable.push(caller);
            }
        }
    }

    OracleResult {
        functions,
        resumable,
    }
}

fn collect_function(node: Node<'_>, source: &str) -> Option<FunctionInfo> {
    let declarator = node.child_by_field_name("declarator")?;
    let name_node = declarator_name(declarator)?;
    let name = lang::text(name_node, source).to_string();

    let inline = has_inline_specifier(node, source)
        || lang::has_ancestor(node, "class_specifier")
        || lang::has_ancestor(node, "struct_specifier");
    let template = lang::has_ancestor(node, "template_declaration");

    let body = node.child_by_field_name("body")?;
    let mut has_suspension = false;
    let mut callees = Vec::new();
    let mut call_sites = Vec::new();

    for n in lang::descendants(body) {
        if n.kind() != "call_expression" || inside_lambda(n, body) {
            continue;
        }
        let Some(callee) = n.child_by_field_name("function") else {
            continue;
        };
        if callee.kind() != "identifier" {
            continue;
        }
        let callee_name = lang::text(callee, source);
        if callee_name == SUSPEND_FN {
            has_suspension = true;
            continue;
        }
        callees.push(callee_name.to_string());
        call_sites.push(statement_span(n));
    }

    Some(FunctionInfo {
        name,
        name_span: lang::span(name_node),
        inline,
        template,
        has_suspension,
        callees,
        call_sites,
    })
}

/// Innermost identifier of a (possibly nested) declarator.
fn declarator_name(declarator: Node<'_>) -> Option<Node<'_>> {
    if declarator.kind() == "identifier"
        || declarator.kind() == "field_identifier"
        || declarator.kind() == "qualified_identifier"
    {
        return Some(declarator);
    }
    if let Some(inner) = declarator.child_by_field_name("declarator") {
        return declarator_name(inner);
    }
    for child in lang::children(declarator) {
        if let Some(found) = declarator_name(child) {
            return Some(found);
        }
    }
    None
}

/// The grammar does not pin `inline` to one node kind, so match on the
/// token text of the definition's direct specifier children.
fn has_inline_specifier(node: Node<'_>, source: &str) -> bool {
    lang::children(node)
        .iter()
        .take_while(|c| c.kind() != "function_declarator" && c.kind() != "compound_statement")
        .any(|c| matches!(lang::text(*c, source), "inline" | "constexpr"))
}

/// Whether `node` sits inside a lambda nested in `body` (lambda bodies are
/// analyzed by the lambda transform, not the oracle).
fn inside_lambda(node: Node<'_>, body: Node<'_>) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if n.id() == body.id() {
            return false;
        }
        if n.kind() == "lambda_expression" {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// Span of the statement enclosing a call, falling back to the call itself.
fn statement_span(node: Node<'_>) -> Span {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if parent.kind() == "expression_statement" {
            return lang::span(parent);
        }
        if parent.kind() == "compound_statement" {
            break;
        }
        cur = parent;
    }
    lang::span(node)
}
