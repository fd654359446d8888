//! Unit tests for capture-list parsing and implicit-capture inference.

use indexmap::IndexSet;

use crate::analyze::captures::{
    DefaultCapture, body_uses_this, free_identifiers, parse_capture_list, parse_params,
};
use crate::analyze::model::CaptureForm;
use crate::lang;

#[test]
fn value_and_ref_captures() {
    let list = parse_capture_list("[n, &sched]");
    assert_eq!(list.default, DefaultCapture::None);
    assert_eq!(list.explicit.len(), 2);
    assert_eq!(list.explicit[0].form, CaptureForm::ByValue);
    assert_eq!(list.explicit[0].name.as_deref(), Some("n"));
    assert_eq!(list.explicit[1].form, CaptureForm::ByRef);
    assert_eq!(list.explicit[1].name.as_deref(), Some("sched"));
}

#[test]
fn init_capture_keeps_initializer_text() {
    let list = parse_capture_list("[n = int(10)]");
    assert_eq!(list.explicit.len(), 1);
    assert_eq!(
        list.explicit[0].form,
        CaptureForm::Init {
            initializer: "int(10)".to_string()
        }
    );
}

#[test]
fn init_capture_with_commas_inside_call() {
    let list = parse_capture_list("[p = make(a, b), q]");
    assert_eq!(list.explicit.len(), 2);
    assert_eq!(
        list.explicit[0].form,
        CaptureForm::Init {
            initializer: "make(a, b)".to_string()
        }
    );
    assert_eq!(list.explicit[1].name.as_deref(), Some("q"));
}

#[test]
fn default_captures() {
    assert_eq!(parse_capture_list("[=]").default, DefaultCapture::ByValue);
    assert_eq!(parse_capture_list("[&]").default, DefaultCapture::ByRef);
    let mixed = parse_capture_list("[&, n]");
    assert_eq!(mixed.default, DefaultCapture::ByRef);
    assert_eq!(mixed.explicit.len(), 1);
}

#[test]
fn this_capture() {
    let list = parse_capture_list("[this, x]");
    assert_eq!(list.explicit[0].form, CaptureForm::This);
    assert_eq!(list.explicit[0].name, None);
}

#[test]
fn free_identifiers_skip_callees_and_qualified_names() {
    let tree = lang::parse("void f() { [&]() mutable { printf(\"%d\", n); std::cout << m; }; }");
    let source = "void f() { [&]() mutable { printf(\"%d\", n); std::cout << m; }; }";
    let lambda = lang::descendants(tree.root_node())
        .into_iter()
        .find(|n| n.kind() == "lambda_expression")
        .expect("lambda");
    let body = lambda.child_by_field_name("body").expect("body");
    let free = free_identifiers(body, source, &IndexSet::new());
    assert!(free.contains(&"n".to_string()));
    assert!(!free.contains(&"printf".to_string()), "callee captured");
    assert!(!free.contains(&"cout".to_string()), "qualified name captured");
}

#[test]
fn free_identifiers_respect_bound_set() {
    let src = "void f() { [=]() mutable { use(i, j); }; }";
    let tree = lang::parse(src);
    let lambda = lang::descendants(tree.root_node())
        .into_iter()
        .find(|n| n.kind() == "lambda_expression")
        .unwrap();
    let body = lambda.child_by_field_name("body").unwrap();
    let mut bound = IndexSet::new();
    bound.insert("i".to_string());
    let free = free_identifiers(body, src, &bound);
    assert_eq!(free, vec!["j".to_string()]);
}

#[test]
fn detects_this_use() {
    let src = "struct S { void m() { [=]() mutable { this->go(); }; } };";
    let tree = lang::parse(src);
    let lambda = lang::descendants(tree.root_node())
        .into_iter()
        .find(|n| n.kind() == "lambda_expression")
        .unwrap();
    let body = lambda.child_by_field_name("body").unwrap();
    assert!(body_uses_this(body, src));
}

#[test]
fn params_parse_types_and_names() {
    let params = parse_params("(int x, foo& y)");
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].ty, "int");
    assert_eq!(params[0].name.as_deref(), Some("x"));
    assert_eq!(params[1].ty, "foo&");
    assert_eq!(params[1].name.as_deref(), Some("y"));
}

#[test]
fn empty_param_list() {
    assert!(parse_params("()").is_empty());
}

#[test]
fn unnamed_param_has_no_name() {
    let params = parse_params("(int)");
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].ty, "int");
    assert_eq!(params[0].name, None);
}
