//! Unit tests for the token scanner.

use crate::lexer::{Tok, lex};

fn kinds(source: &str) -> Vec<Tok> {
    lex(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect()
}

#[test]
fn idents_and_punctuation() {
    assert_eq!(
        kinds("yield n;"),
        vec![Tok::Ident, Tok::Ident, Tok::Semi]
    );
}

#[test]
fn keywords_are_plain_idents() {
    let src = "return from g;";
    let toks = lex(src);
    let texts: Vec<&str> = toks
        .iter()
        .filter(|t| t.kind == Tok::Ident)
        .map(|t| t.text(src))
        .collect();
    assert_eq!(texts, vec!["return", "from", "g"]);
}

#[test]
fn comments_and_strings_are_opaque() {
    let src = "/* yield */ \"yield from\" // yield\n";
    assert_eq!(
        kinds(src),
        vec![Tok::String]
    );
}

#[test]
fn preproc_line_is_one_token() {
    let src = "#include \"gen.hpp\"\nint x;";
    let toks = kinds(src);
    assert_eq!(toks[0], Tok::Preproc);
    assert_eq!(toks[1], Tok::Ident);
}

#[test]
fn multi_char_operators() {
    assert_eq!(kinds("a->b::c"), vec![
        Tok::Ident,
        Tok::Arrow,
        Tok::Ident,
        Tok::ColonColon,
        Tok::Ident
    ]);
}

#[test]
fn block_comment_spanning_lines() {
    let src = "a /* line1\nline2 */ b";
    assert_eq!(kinds(src), vec![Tok::Ident, Tok::Ident]);
    let toks = lex(src);
    assert!(toks.iter().any(|t| t.kind == Tok::BlockComment));
}

#[test]
fn garbage_bytes_are_coalesced() {
    let src = "a @@ b";
    let toks = lex(src);
    let garbage: Vec<_> = toks.iter().filter(|t| t.kind == Tok::Garbage).collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(garbage[0].text(src), "@@");
}

#[test]
fn spans_cover_the_source() {
    let src = "auto f = [n = int(10)]() mutable { return n; };";
    let toks = lex(src);
    let total: usize = toks.iter().map(|t| t.span.len()).sum();
    assert_eq!(total, src.len());
}
