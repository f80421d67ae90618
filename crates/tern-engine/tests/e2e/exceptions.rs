//! Exceptions: throw, try/catch/finally and what escapes to the host.

use super::harness::*;
use tern_engine::ErrorKind;

// ============================================================================
// try / catch
// ============================================================================

#[test]
fn test_catch_receives_thrown_value() {
    expect_i32("var r; try { throw 42; } catch (e) { r = e; } r;", 42);
    expect_string("var r; try { throw 'boom'; } catch (e) { r = e; } r;", "boom");
}

#[test]
fn test_catch_receives_error_object() {
    expect_string(
        "var r; try { throw new TypeError('bad'); } catch (e) { r = e.name + ':' + e.message; } r;",
        "TypeError:bad",
    );
}

#[test]
fn test_engine_errors_are_catchable() {
    expect_bool(
        "var ok = false; try { null.x; } catch (e) { ok = e instanceof TypeError; } ok;",
        true,
    );
    expect_bool(
        "var ok = false; try { missing; } catch (e) { ok = e instanceof ReferenceError; } ok;",
        true,
    );
}

#[test]
fn test_catch_parameter_is_scoped_to_clause() {
    expect_string("var e = 'outer'; try { throw 'inner'; } catch (e) {} e;", "outer");
}

#[test]
fn test_throw_unwinds_through_calls() {
    expect_string(
        "function inner() { throw new Error('deep'); }
         function middle() { inner(); return 'unreached'; }
         var r; try { middle(); } catch (e) { r = e.message; } r;",
        "deep",
    );
}

#[test]
fn test_nested_handlers_catch_innermost_first() {
    expect_string(
        "var log = '';
         try {
           try { throw 1; } catch (e) { log += 'inner' + e; throw 2; }
         } catch (e) { log += ',outer' + e; }
         log;",
        "inner1,outer2",
    );
}

#[test]
fn test_code_after_caught_throw_continues() {
    expect_i32("var n = 0; try { throw 0; } catch (e) { n = 1; } n += 1; n;", 2);
}

// ============================================================================
// finally
// ============================================================================

#[test]
fn test_finally_runs_on_normal_exit() {
    expect_string("var log = ''; try { log += 't'; } finally { log += 'f'; } log;", "tf");
}

#[test]
fn test_finally_runs_after_catch() {
    expect_string(
        "var log = ''; try { throw 0; } catch (e) { log += 'c'; } finally { log += 'f'; } log;",
        "cf",
    );
}

#[test]
fn test_finally_runs_on_return() {
    expect_string(
        "var log = '';
         function f() { try { return 'r'; } finally { log += 'f'; } }
         var r = f(); log + r;",
        "fr",
    );
}

#[test]
fn test_finally_runs_on_break() {
    expect_i32(
        "var n = 0;
         for (var i = 0; i < 5; i++) { try { if (i === 2) break; } finally { n++; } }
         n;",
        3,
    );
}

#[test]
fn test_finally_rethrows_pending_exception() {
    expect_string(
        "var log = '';
         try { try { throw 'x'; } finally { log += 'f'; } } catch (e) { log += e; }
         log;",
        "fx",
    );
}

#[test]
fn test_throw_in_finally_replaces_exception() {
    expect_string(
        "var r; try { try { throw 'first'; } finally { throw 'second'; } } catch (e) { r = e; } r;",
        "second",
    );
}

#[test]
fn test_return_in_finally_overrides_throw() {
    expect_i32("function f() { try { throw 1; } finally { return 2; } } f();", 2);
}

// ============================================================================
// Error objects
// ============================================================================

#[test]
fn test_error_to_string() {
    expect_string("String(new Error('m'));", "Error: m");
    expect_string("String(new RangeError());", "RangeError");
    expect_string("var e = new Error('m'); e.name = ''; e.toString();", "m");
}

#[test]
fn test_error_constructor_without_new() {
    expect_bool("var e = TypeError('t'); e instanceof TypeError && e instanceof Error;", true);
}

#[test]
fn test_error_message_is_own_and_hidden() {
    expect_string(
        "var e = new Error('m');
         '' + e.hasOwnProperty('message') + Object.keys(e).length;",
        "true0",
    );
}

// ============================================================================
// Uncaught
// ============================================================================

#[test]
fn test_uncaught_error_keeps_kind_and_message() {
    expect_runtime_error("throw new RangeError('out of range');", ErrorKind::RangeError, "out of range");
}

#[test]
fn test_uncaught_primitive_is_wrapped() {
    expect_runtime_error("throw 42;", ErrorKind::Error, "Uncaught 42");
    expect_runtime_error("throw 'boom';", ErrorKind::Error, "Uncaught boom");
}

#[test]
fn test_uncaught_error_carries_stack_trace() {
    let source = "function inner() {\n  throw new Error('x');\n}\nfunction outer() {\n  inner();\n}\nouter();";
    match compile_and_run(source) {
        Err(E2EError::Runtime(e)) => {
            let names: Vec<&str> = e.stack_trace.iter().map(|f| f.function.as_str()).collect();
            assert_eq!(names, vec!["inner", "outer", "<script>"]);
            assert_eq!(e.stack_trace[0].line, 2);
            assert_eq!(e.stack_trace[1].line, 5);
            assert!(e.format_with_trace().starts_with("Error: x\n    at inner (line 2)"));
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_caught_error_leaves_no_trace_behind() {
    let source = "try { (function f() { throw 1; })(); } catch (e) {}\nthrow new Error('later');";
    match compile_and_run(source) {
        Err(E2EError::Runtime(e)) => {
            assert_eq!(e.message, "later");
            assert_eq!(e.stack_trace.len(), 1);
            assert_eq!(e.stack_trace[0].function, "<script>");
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
}
