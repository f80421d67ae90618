//! Functions: hoisting, closures, `this`, `arguments`, and the call
//! builtins.

use super::harness::*;
use tern_engine::{EngineOptions, ErrorKind};

// ============================================================================
// Declarations and Hoisting
// ============================================================================

#[test]
fn test_function_declaration_is_hoisted() {
    expect_i32("var r = twice(21); function twice(x) { return x * 2; } r;", 42);
}

#[test]
fn test_var_is_hoisted_without_value() {
    expect_string("var before = typeof v; var v = 1; before;", "undefined");
}

#[test]
fn test_inner_declarations_are_hoisted() {
    expect_i32(
        "function outer() { return inner(); function inner() { return 7; } }
         outer();",
        7,
    );
}

#[test]
fn test_named_function_expression_sees_itself() {
    expect_i32(
        "var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); };
         fact(5);",
        120,
    );
}

#[test]
fn test_recursion() {
    expect_i32("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15);", 610);
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_closure_counter() {
    expect_i32(
        "function counter() { var n = 0; return function () { n += 1; return n; }; }
         var c = counter(); c(); c();
         c();",
        3,
    );
}

#[test]
fn test_closures_share_captured_variable() {
    expect_i32(
        "function pair() {
           var v = 1;
           return { get: function () { return v; }, set: function (x) { v = x; } };
         }
         var p = pair(); p.set(9);
         p.get();",
        9,
    );
}

#[test]
fn test_closure_over_parameter() {
    expect_i32("function adder(a) { return function (b) { return a + b; }; } adder(40)(2);", 42);
}

#[test]
fn test_nested_closure_reads_grandparent() {
    expect_i32(
        "function a() { var x = 5; return function () { return function () { return x * 2; }; }; }
         a()()();",
        10,
    );
}

#[test]
fn test_var_loop_closures_share_binding() {
    expect_string(
        "var fs = [];
         for (var i = 0; i < 3; i++) { fs.push(function () { return i; }); }
         '' + fs[0]() + fs[1]() + fs[2]();",
        "333",
    );
}

// ============================================================================
// this
// ============================================================================

#[test]
fn test_method_call_binds_this() {
    expect_i32("var o = { v: 4, get: function () { return this.v; } }; o.get();", 4);
}

#[test]
fn test_sloppy_plain_call_binds_global() {
    expect_bool("var self = function () { return this; }; self() === this;", true);
}

#[test]
fn test_strict_plain_call_binds_undefined() {
    expect_bool("function f() { 'use strict'; return this === undefined; } f();", true);
}

#[test]
fn test_constructor_creates_instance() {
    expect_i32(
        "function Point(x, y) { this.x = x; this.y = y; }
         Point.prototype.sum = function () { return this.x + this.y; };
         var p = new Point(3, 4);
         p.sum();",
        7,
    );
}

#[test]
fn test_constructor_returning_object_replaces_instance() {
    expect_i32("function F() { this.a = 1; return { a: 2 }; } new F().a;", 2);
}

// ============================================================================
// arguments
// ============================================================================

#[test]
fn test_arguments_object() {
    expect_i32("function f() { return arguments.length; } f(1, 2, 3);", 3);
    expect_i32("function g() { return arguments[1]; } g(5, 6);", 6);
}

#[test]
fn test_missing_parameters_are_undefined() {
    expect_bool("function f(a, b) { return b === undefined; } f(1);", true);
}

#[test]
fn test_function_length_and_name() {
    expect_string("function named(a, b, c) {} named.name + named.length;", "named3");
}

// ============================================================================
// call / apply / Function
// ============================================================================

#[test]
fn test_call_passes_this_and_arguments() {
    expect_i32("function f(a, b) { return this.base + a + b; } f.call({ base: 10 }, 1, 2);", 13);
}

#[test]
fn test_apply_spreads_array() {
    expect_i32("function f(a, b, c) { return a * b * c; } f.apply(null, [2, 3, 4]);", 24);
    expect_i32("function g() { return arguments.length; } g.apply(null);", 0);
}

#[test]
fn test_apply_rejects_non_object_list() {
    expect_runtime_error("function f() {} f.apply(null, 1);", ErrorKind::TypeError, "CreateListFromArrayLike");
}

#[test]
fn test_function_constructor() {
    expect_i32("var add = new Function('a', 'b', 'return a + b;'); add(2, 3);", 5);
    expect_i32("Function('return 9')();", 9);
}

#[test]
fn test_function_constructor_runs_in_global_scope() {
    expect_string(
        "var x = 'global';
         function f() { var x = 'local'; return Function('return x;')(); }
         f();",
        "global",
    );
}

// ============================================================================
// Call Errors and Limits
// ============================================================================

#[test]
fn test_calling_non_function() {
    expect_runtime_error("var o = {}; o.missing();", ErrorKind::TypeError, "is not a function");
    expect_runtime_error("var n = 1; n();", ErrorKind::TypeError, "1 is not a function");
}

#[test]
fn test_new_on_non_constructor() {
    expect_runtime_error("var f = Object.keys; new f({});", ErrorKind::TypeError, "is not a constructor");
}

#[test]
fn test_unbounded_recursion_is_range_error() {
    expect_runtime_error(
        "function down(n) { return down(n + 1); } down(0);",
        ErrorKind::RangeError,
        "Maximum call stack size exceeded",
    );
}

#[test]
fn test_call_depth_is_configurable() {
    let options = EngineOptions {
        max_call_depth: 10,
        ..EngineOptions::default()
    };
    let deep = "function d(n) { return n === 0 ? 0 : 1 + d(n - 1); } d(20);";
    match compile_and_run_with(deep, options.clone()) {
        Err(E2EError::Runtime(e)) => assert_eq!(e.kind, ErrorKind::RangeError),
        other => panic!("expected RangeError, got {:?}", other),
    }
    let shallow = "function d(n) { return n === 0 ? 0 : 1 + d(n - 1); } d(5);";
    assert_eq!(
        compile_and_run_with(shallow, options).expect("shallow recursion").as_number(),
        Some(5.0)
    );
}

#[test]
fn test_recursion_caught_by_script() {
    expect_bool(
        "function down() { return down(); }
         var ok = false;
         try { down(); } catch (e) { ok = e instanceof RangeError; }
         ok;",
        true,
    );
}
