//! Keyword encoder.
//!
//! Rewrites the extension keywords into parse-legal constructs before the
//! host parser runs, so their shapes are unambiguously detectable on the
//! syntax tree:
//!
//! | keyword                      | encoding                        |
//! |------------------------------|---------------------------------|
//! | `resumable` (lambda)         | `mutable` + recorded marker     |
//! | `yield E;`                   | `__co_yield(E);`                |
//! | `yield from G;`              | `__co_yield_from(G);`           |
//! | `return from G;`             | `return __co_from(G);`          |
//! | `break_resumable;`/`co_yield;`| `__co_suspend();`              |
//! | `lambda_this`                | `__co_lambda_this`              |
//!
//! Encodings never add or remove newlines, so line numbers in the encoded
//! buffer match the original input. Keywords inside comments, string
//! literals and preprocessor lines are left alone.

use crate::lexer::{Tok, Token, lex};

pub const YIELD_FN: &str = "__co_yield";
pub const YIELD_FROM_FN: &str = "__co_yield_from";
pub const RETURN_FROM_FN: &str = "__co_from";
pub const SUSPEND_FN: &str = "__co_suspend";
pub const LAMBDA_THIS: &str = "__co_lambda_this";

/// Encoder output: the buffer handed to the host parser plus the offsets
/// (into that buffer) of every `resumable` marker.
#[derive(Debug, Clone)]
pub struct EncodedSource {
    pub text: String,
    /// Start offsets of the `mutable` tokens that stand in for `resumable`.
    pub resumable_markers: Vec<usize>,
}

/// Statement openers: a `yield` directly after one of these begins a
/// statement, anything else is an ordinary identifier.
fn opens_statement(prev: Option<(Tok, &str)>) -> bool {
    match prev {
        None => true,
        Some((Tok::Semi | Tok::LBrace | Tok::RBrace | Tok::RParen, _)) => true,
        Some((Tok::Op, ":")) => true,
        Some((Tok::Ident, "else" | "do")) => true,
        Some((Tok::Preproc | Tok::LineComment | Tok::BlockComment, _)) => true,
        _ => false,
    }
}

pub fn encode(source: &str) -> EncodedSource {
    let tokens = lex(source);
    let mut out = String::with_capacity(source.len() + 256);
    let mut markers = Vec::new();
    let mut prev_sig: Option<Token> = None;
    // Source bracket depth, and the depths at which an inserted wrapper
    // paren is still owed its close. Wrapped expressions flow through the
    // main loop, so keywords nested inside them are encoded too.
    let mut depth = 0i32;
    let mut pending_close: Vec<i32> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        if tok.kind.is_trivia() {
            out.push_str(tok.text(source));
            i += 1;
            continue;
        }

        let prev = prev_sig.map(|t| (t.kind, t.text(source)));
        let handled = match (tok.kind, tok.text(source)) {
            (Tok::Ident, "resumable") => {
                if matches!(prev, Some((Tok::RBracket, _))) {
                    // `[caps] resumable { ... }` - supply the parameter list
                    // the host grammar wants before a specifier.
                    out.push_str("() ");
                }
                markers.push(out.len());
                out.push_str("mutable");
                i += 1;
                true
            }
            (Tok::Ident, "yield") => {
                if let Some(j) = next_ident(&tokens, i + 1, source, "from") {
                    out.push_str(YIELD_FROM_FN);
                    out.push('(');
                    copy_trivia(&tokens[i + 1..j], source, &mut out);
                    pending_close.push(depth);
                    i = j + 1;
                    true
                } else if opens_statement(prev) {
                    out.push_str(YIELD_FN);
                    out.push('(');
                    pending_close.push(depth);
                    i += 1;
                    true
                } else {
                    false
                }
            }
            (Tok::Ident, "return") => {
                if let Some(j) = next_ident(&tokens, i + 1, source, "from") {
                    out.push_str("return ");
                    out.push_str(RETURN_FROM_FN);
                    out.push('(');
                    copy_trivia(&tokens[i + 1..j], source, &mut out);
                    pending_close.push(depth);
                    i = j + 1;
                    true
                } else {
                    false
                }
            }
            (Tok::Ident, "break_resumable" | "co_yield") => {
                let next_is_semi = tokens[i + 1..]
                    .iter()
                    .find(|t| !t.kind.is_trivia())
                    .is_some_and(|t| t.kind == Tok::Semi);
                if opens_statement(prev) && next_is_semi {
                    out.push_str(SUSPEND_FN);
                    out.push_str("()");
                    i += 1;
                    true
                } else {
                    false
                }
            }
            (Tok::Ident, "lambda_this") => {
                out.push_str(LAMBDA_THIS);
                i += 1;
                true
            }
            _ => false,
        };

        if !handled {
            match tok.kind {
                Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
                Tok::Semi => {
                    while pending_close.last() == Some(&depth) {
                        pending_close.pop();
                        out.push(')');
                    }
                }
                _ => {}
            }
            out.push_str(tok.text(source));
            i += 1;
        }
        prev_sig = Some(tok);
    }
    for _ in pending_close.drain(..) {
        out.push(')');
    }

    EncodedSource {
        text: out,
        resumable_markers: markers,
    }
}

/// If the next significant token is the identifier `word`, return its index.
fn next_ident(tokens: &[Token], from: usize, source: &str, word: &str) -> Option<usize> {
    let mut j = from;
    while j < tokens.len() {
        let t = tokens[j];
        if t.kind.is_trivia() {
            j += 1;
            continue;
        }
        return (t.kind == Tok::Ident && t.text(source) == word).then_some(j);
    }
    None
}

/// Preserve line breaks and comments of skipped trivia, so encoding never
/// moves a line. Plain spacing between the two keyword tokens is dropped.
fn copy_trivia(tokens: &[Token], source: &str, out: &mut String) {
    for t in tokens {
        if !t.kind.is_trivia() {
            continue;
        }
        let text = t.text(source);
        if t.kind != Tok::Whitespace || text.contains('\n') {
            out.push_str(text);
        }
    }
}
