//! Capture-list parsing and implicit-capture inference.
//!
//! Explicit captures come straight from the bracketed list. Default
//! captures (`[=]`, `[&]`) are resolved against the free identifiers of the
//! body - the syntax-tree approximation of the host semantic analyzer's
//! capture set.

use arborium_tree_sitter::Node;
use indexmap::IndexSet;

use crate::analyze::model::{Capture, CaptureForm};
use crate::encode::LAMBDA_THIS;
use crate::lang;
use crate::lexer::{Tok, Token, lex};

/// Default-capture mode of a lambda introducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultCapture {
    None,
    ByValue,
    ByRef,
}

#[derive(Debug)]
pub struct CaptureList {
    pub default: DefaultCapture,
    pub explicit: Vec<Capture>,
}

/// Parse the text inside a lambda introducer, e.g. `[&sched, i = int(0)]`.
pub fn parse_capture_list(list_text: &str) -> CaptureList {
    let inner = list_text
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(list_text);

    let mut default = DefaultCapture::None;
    let mut explicit = Vec::new();

    for item in split_top_level(inner) {
        let item = item.trim();
        match item {
            "" => {}
            "=" => default = DefaultCapture::ByValue,
            "&" => default = DefaultCapture::ByRef,
            "this" => explicit.push(Capture {
                form: CaptureForm::This,
                name: None,
            }),
            _ => {
                if let Some(name) = item.strip_prefix('&') {
                    explicit.push(Capture {
                        form: CaptureForm::ByRef,
                        name: Some(name.trim().to_string()),
                    });
                } else if let Some((name, init)) = split_init_capture(item) {
                    explicit.push(Capture {
                        form: CaptureForm::Init { initializer: init },
                        name: Some(name),
                    });
                } else {
                    explicit.push(Capture {
                        form: CaptureForm::ByValue,
                        name: Some(item.to_string()),
                    });
                }
            }
        }
    }

    CaptureList { default, explicit }
}

/// Split on commas at bracket depth zero.
fn split_top_level(s: &str) -> Vec<String> {
    let tokens = lex(s);
    let mut depth = 0i32;
    let mut parts = Vec::new();
    let mut start = 0usize;
    for t in &tokens {
        match t.kind {
            Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
            Tok::Comma if depth == 0 => {
                parts.push(s[start..t.span.start()].to_string());
                start = t.span.end();
            }
            _ => {}
        }
    }
    parts.push(s[start..].to_string());
    parts
}

/// `name = initializer` at depth zero.
fn split_init_capture(item: &str) -> Option<(String, String)> {
    let tokens: Vec<Token> = lex(item)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    if tokens.len() >= 2
        && tokens[0].kind == Tok::Ident
        && tokens[1].kind == Tok::Op
        && tokens[1].text(item) == "="
    {
        let name = tokens[0].text(item).to_string();
        let init = item[tokens[1].span.end()..].trim().to_string();
        return Some((name, init));
    }
    None
}

/// Free identifiers of the lambda body, in first-appearance order.
///
/// Excludes: names bound inside the lambda (`bound`), call callees, members
/// of a qualified name, field accesses (a different node kind already), the
/// encoder's reserved names, and identifiers inside nested lambdas.
pub fn free_identifiers(
    body: Node<'_>,
    source: &str,
    bound: &IndexSet<String>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for node in lang::descendants(body) {
        if node.kind() != "identifier" {
            continue;
        }
        if inside_nested_lambda(node, body) || inside_qualified_name(node, body) {
            continue;
        }
        if is_call_callee(node) {
            continue;
        }
        let name = lang::text(node, source);
        if name.starts_with("__co_") || name == LAMBDA_THIS {
            continue;
        }
        if bound.contains(name) {
            continue;
        }
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Whether the lambda body mentions `this` (explicitly or via the
/// `lambda_this` placeholder's enclosing-object use is *not* this).
pub fn body_uses_this(body: Node<'_>, _source: &str) -> bool {
    lang::descendants(body)
        .into_iter()
        .any(|n| n.kind() == "this" && !inside_nested_lambda(n, body))
}

fn inside_nested_lambda(node: Node<'_>, body: Node<'_>) -> bool {
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

fn inside_qualified_name(node: Node<'_>, body: Node<'_>) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if n.id() == body.id() {
            return false;
        }
        if n.kind() == "qualified_identifier" {
            return true;
        }
        cur = n.parent();
    }
    false
}

fn is_call_callee(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|p| {
            p.kind() == "call_expression"
                && p.child_by_field_name("function")
                    .is_some_and(|f| f.id() == node.id())
        })
}

/// One parsed parameter of the lambda's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: Option<String>,
}

/// Parse `(int x, foo& y)` into type/name pairs. The last identifier of
/// each item (before any default argument) is taken as the name.
pub fn parse_params(params_text: &str) -> Vec<Param> {
    let inner = params_text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(params_text);
    if inner.trim().is_empty() {
        return Vec::new();
    }

    split_top_level(inner)
        .into_iter()
        .map(|item| {
            let item = item.trim();
            // Cut a default argument off first.
            let head = match item.split_once('=') {
                Some((h, _)) => h.trim_end(),
                None => item,
            };
            let tokens: Vec<Token> = lex(head)
                .into_iter()
                .filter(|t| !t.kind.is_trivia())
                .collect();
            match tokens.last() {
                Some(last) if last.kind == Tok::Ident && tokens.len() > 1 => Param {
                    ty: head[..last.span.start()].trim_end().to_string(),
                    name: Some(last.text(head).to_string()),
                },
                _ => Param {
                    ty: head.to_string(),
                    name: None,
                },
            }
        })
        .collect()
}
