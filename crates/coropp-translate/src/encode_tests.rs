//! Unit tests for the keyword encoder.

use indoc::indoc;

use crate::encode::encode;

#[test]
fn plain_yield_statement() {
    let enc = encode("yield n;");
    assert_eq!(enc.text, "__co_yield( n);");
}

#[test]
fn yield_in_else_branch() {
    let enc = encode("if (n == 1) return n;\nelse yield n;");
    assert_eq!(enc.text, "if (n == 1) return n;\nelse __co_yield( n);");
}

#[test]
fn yield_from_lvalue() {
    let enc = encode("yield from f1;");
    assert_eq!(enc.text, "__co_yield_from( f1);");
}

#[test]
fn return_from() {
    let enc = encode("return from f2;");
    assert_eq!(enc.text, "return __co_from( f2);");
}

#[test]
fn plain_return_untouched() {
    let enc = encode("return n;");
    assert_eq!(enc.text, "return n;");
}

#[test]
fn resumable_specifier_becomes_mutable() {
    let enc = encode("auto f = [n = int(10)]() resumable\n{\n};");
    assert_eq!(enc.text, "auto f = [n = int(10)]() mutable\n{\n};");
    assert_eq!(enc.resumable_markers.len(), 1);
    let at = enc.resumable_markers[0];
    assert_eq!(&enc.text[at..at + "mutable".len()], "mutable");
}

#[test]
fn resumable_without_parameter_list_gains_one() {
    let enc = encode("auto h = [=] resumable { return 1; };");
    assert_eq!(enc.text, "auto h = [=] () mutable { return 1; };");
    assert_eq!(enc.resumable_markers.len(), 1);
}

#[test]
fn break_resumable_and_co_yield() {
    assert_eq!(encode("break_resumable;").text, "__co_suspend();");
    assert_eq!(encode("co_yield;").text, "__co_suspend();");
}

#[test]
fn lambda_this_placeholder() {
    let enc = encode("yield sched.post(*lambda_this);");
    assert_eq!(enc.text, "__co_yield( sched.post(*__co_lambda_this));");
}

#[test]
fn keywords_in_comments_and_strings_stay() {
    let src = "// yield n;\nconst char* s = \"yield from g;\";";
    assert_eq!(encode(src).text, src);
}

#[test]
fn yield_expression_with_nested_semicolons_in_brackets() {
    let enc = encode("yield f(a, b) + g[i];");
    assert_eq!(enc.text, "__co_yield( f(a, b) + g[i]);");
}

#[test]
fn newlines_are_preserved() {
    let src = indoc! {r#"
        auto f = [n = int(10)]() resumable
        {
          while (--n > 0)
            if (n == 1) return n;
            else yield n;
        };
    "#};
    let enc = encode(src);
    assert_eq!(
        src.matches('\n').count(),
        enc.text.matches('\n').count()
    );
}

#[test]
fn identifier_named_yield_in_expression_position() {
    let src = "int x = yield + 1;";
    assert_eq!(encode(src).text, src);
}
