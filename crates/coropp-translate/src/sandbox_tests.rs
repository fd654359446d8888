//! Unit tests for the include sandbox.

use std::fs;

use crate::sandbox::{Sandbox, SandboxError, find_includes, scan_closure};

#[test]
fn finds_quoted_and_angle_includes() {
    let src = "#include <stdio.h>\n#include \"gen.hpp\"\nint x;\n";
    let includes = find_includes(src);
    assert_eq!(includes.len(), 2);
    assert!(!includes[0].quoted);
    assert_eq!(includes[0].path, "stdio.h");
    assert!(includes[1].quoted);
    assert_eq!(includes[1].path, "gen.hpp");
}

#[test]
fn parent_segment_is_rejected_before_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();
    let err = sb.check("../etc/passwd", dir.path()).unwrap_err();
    assert!(matches!(err, SandboxError::ParentSegment { .. }));
}

#[test]
fn metacharacters_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();
    for path in ["a;b.h", "a b.h", "a`b.h", "a$(x).h", "a\tb.h"] {
        let err = sb.check(path, dir.path()).unwrap_err();
        assert!(
            matches!(err, SandboxError::ForbiddenCharacter { .. }),
            "{path} should be rejected"
        );
    }
}

#[test]
fn absolute_path_outside_root_escapes() {
    let dir = tempfile::tempdir().unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();
    let err = sb.check("/etc/passwd", dir.path()).unwrap_err();
    assert!(matches!(err, SandboxError::Escapes { .. }));
}

#[test]
fn file_inside_root_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gen.hpp"), "int g;\n").unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();
    let real = sb.check("gen.hpp", dir.path()).unwrap();
    assert!(real.ends_with("gen.hpp"));
}

#[test]
fn closure_walks_transitive_includes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.hpp"), "#include \"b.hpp\"\n").unwrap();
    fs::write(dir.path().join("b.hpp"), "int b;\n").unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();

    let mut entered = Vec::new();
    scan_closure(
        "#include \"a.hpp\"\n",
        dir.path(),
        Some(&sb),
        &mut entered,
    )
    .unwrap();
    assert_eq!(entered.len(), 2);
}

#[test]
fn closure_rejects_transitive_escape() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.hpp"),
        "#include \"../outside.hpp\"\n",
    )
    .unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();

    let mut entered = Vec::new();
    let err = scan_closure(
        "#include \"a.hpp\"\n",
        dir.path(),
        Some(&sb),
        &mut entered,
    )
    .unwrap_err();
    assert!(matches!(err, SandboxError::ParentSegment { .. }));
}

#[test]
fn angle_includes_are_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let sb = Sandbox::new(dir.path()).unwrap();
    let mut entered = Vec::new();
    scan_closure("#include <stdio.h>\n", dir.path(), Some(&sb), &mut entered).unwrap();
    assert!(entered.is_empty());
}

#[test]
fn include_cycles_terminate() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.hpp"), "#include \"b.hpp\"\n").unwrap();
    fs::write(dir.path().join("b.hpp"), "#include \"a.hpp\"\n").unwrap();

    let mut entered = Vec::new();
    scan_closure(
        "#include \"a.hpp\"\n",
        dir.path(),
        None,
        &mut entered,
    )
    .unwrap();
    assert_eq!(entered.len(), 2);
}
