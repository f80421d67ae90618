//! Compile-time errors: syntax, strict-mode early errors and static
//! `let`/`const` misuse.

use super::harness::*;
use tern_engine::{CompileErrorKind, CompileOptions, Engine, EngineOptions};

fn compile_error(source: &str) -> tern_engine::CompileError {
    match compile(source) {
        Err(E2EError::Compile(e)) => e,
        Ok(_) => panic!("expected compile error for:\n{}", source),
        Err(e) => panic!("unexpected {}", e),
    }
}

// ============================================================================
// Syntax Errors
// ============================================================================

#[test]
fn test_syntax_error_reports_position() {
    let err = compile_error("var ok = 1;\nvar = 2;");
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert_eq!((err.line, err.column), (2, 5));
    assert!(err.to_string().starts_with("SyntaxError: "));
}

#[test]
fn test_lexical_errors_are_syntax_errors() {
    expect_compile_error("var s = 'open;", "SyntaxError");
    expect_compile_error("var c = 1; /* never closed", "SyntaxError");
    expect_compile_error("var x = @;", "SyntaxError");
}

#[test]
fn test_invalid_assignment_targets() {
    expect_compile_error("1 = 2;", "SyntaxError");
    expect_compile_error("f() = 1;", "SyntaxError");
}

#[test]
fn test_misplaced_control_statements() {
    expect_compile_error("break;", "SyntaxError");
    expect_compile_error("continue;", "SyntaxError");
    expect_compile_error("return 1;", "SyntaxError");
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let deep = format!("{}1{}", "[".repeat(2_000), "]".repeat(2_000));
    expect_compile_error(&deep, "SyntaxError");
}

#[test]
fn test_parse_depth_is_configurable() {
    let engine = Engine::new(EngineOptions {
        max_parse_depth: 16,
        ..EngineOptions::default()
    })
    .expect("valid options");
    let nested = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    assert!(engine.compile_script(&nested).is_err());
    assert!(engine.compile_script("((1));").is_ok());
}

// ============================================================================
// Strict Mode
// ============================================================================

#[test]
fn test_strict_mode_early_errors() {
    for source in [
        "'use strict'; with ({}) {}",
        "'use strict'; var n = 010;",
        "'use strict'; var s = '\\07';",
        "'use strict'; function f(a, a) {}",
        "'use strict'; var eval = 1;",
        "'use strict'; function arguments() {}",
        "'use strict'; var x; delete x;",
    ] {
        let err = compile_error(source);
        assert_eq!(err.kind, CompileErrorKind::Syntax, "for {}", source);
    }
}

#[test]
fn test_sloppy_mode_allows_the_same_code() {
    for source in [
        "with ({}) {}",
        "var n = 010;",
        "function f(a, a) {}",
        "var x; delete x;",
    ] {
        assert!(compile(source).is_ok(), "expected {} to compile", source);
    }
}

#[test]
fn test_function_level_directive() {
    expect_compile_error("function f() { 'use strict'; with ({}) {} }", "strict mode");
    assert!(compile("function f() { 'use strict'; } with ({}) {}").is_ok());
}

#[test]
fn test_strict_compile_option() {
    let engine = Engine::default();
    let options = CompileOptions {
        strict_mode: true,
        ..CompileOptions::default()
    };
    assert!(engine.compile("with ({}) {}", &options).is_err());
}

// ============================================================================
// let / const
// ============================================================================

#[test]
fn test_use_before_let_is_reference_error() {
    let err = compile_error("function f() { x = 1; let x; }");
    assert_eq!(err.kind, CompileErrorKind::Reference);
    assert!(err.message.contains("before initialization"));
}

#[test]
fn test_assignment_to_const_is_reference_error() {
    let err = compile_error("const c = 1; c = 2;");
    assert_eq!(err.kind, CompileErrorKind::Reference);
    assert!(err.message.contains("Assignment to constant variable 'c'"));
}

#[test]
fn test_let_redeclaration_is_syntax_error() {
    let err = compile_error("let a = 1; let a = 2;");
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert!(err.message.contains("already been declared"));
}

#[test]
fn test_closure_use_before_let_is_allowed() {
    expect_i32("function f() { function g() { return v; } let v = 5; return g(); } f();", 5);
}

// ============================================================================
// Regular Expression Literals
// ============================================================================

#[test]
fn test_regex_after_control_head() {
    expect_string(
        "var r = 'none'; if (true) /a/.source.length ? r = 'yes' : r = 'no'; r;",
        "yes",
    );
    expect_string("var r = ''; for (var i = 0; i < 2; i++) r += /b/.source; r;", "bb");
}

#[test]
fn test_regex_after_block() {
    expect_string("{}\n/ab/.source;", "ab");
    expect_string("{}\n/=x/.source;", "=x");
}

#[test]
fn test_division_still_divides() {
    expect_i32("var a = 8, g = 2; a / g / 2;", 2);
    expect_i32("var a = 9; a /= 3; a;", 3);
}
