//! Token scanner for the keyword encoder.
//!
//! This is not a C++ lexer in full; it only needs to split the input into
//! identifiers, literals, comments, preprocessor lines and punctuation so
//! the encoder can find extension keywords in code (and nowhere else) and
//! walk bracketed expressions to their terminating semicolon.
//!
//! Unrecognized bytes are coalesced into single `Garbage` tokens rather than
//! producing one error per character.

use logos::Logos;

use coropp_core::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok {
    #[regex(r"[ \t\r\n\x0c]+")]
    Whitespace,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    /// A whole preprocessor line (`#include`, `#define`, ...).
    #[regex(r"#[^\n]*", allow_greedy = true)]
    Preproc,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Char,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// pp-number: digits with embedded identifier characters and dots.
    #[regex(r"[0-9][0-9a-zA-Z_.]*")]
    Number,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    #[token("::")]
    ColonColon,
    #[token("->")]
    Arrow,

    /// Any other single operator character.
    #[regex(r"[!%^&*+=|~<>/?:.\-]")]
    Op,

    /// Coalesced run of bytes nothing else matched.
    Garbage,
}

impl Tok {
    /// Tokens that never carry syntax: skipped when looking for the previous
    /// or next significant token.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Tok::Whitespace | Tok::LineComment | Tok::BlockComment
        )
    }
}

/// Span-based token; text is sliced from the source on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: Tok,
    pub span: Span,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.text(source)
    }
}

/// Tokenize `source`, coalescing lexer errors into `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = Tok::lexer(source);
    let mut garbage_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = garbage_start.take() {
                    tokens.push(Token {
                        kind: Tok::Garbage,
                        span: Span::new(start, lexer.span().start),
                    });
                }
                tokens.push(Token {
                    kind,
                    span: lexer.span().into(),
                });
            }
            Some(Err(())) => {
                if garbage_start.is_none() {
                    garbage_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = garbage_start.take() {
                    tokens.push(Token {
                        kind: Tok::Garbage,
                        span: Span::new(start, source.len()),
                    });
                }
                break;
            }
        }
    }

    tokens
}
