//! Speculation: promotion, guard failures and sticky deoptimization.

use super::harness::*;
use tern_engine::{CompileOptions, SpecState, Value};

/// Compile `definition` into its own unit, run it, and return the unit so
/// its speculation table can be watched while other scripts call into it.
fn define(session: &mut Session, definition: &str) -> tern_engine::CompiledUnit {
    let unit = session.compile(definition);
    session.run(&unit).expect("definition runs");
    unit
}

// ============================================================================
// Sticky Deoptimization
// ============================================================================

#[test]
fn test_deoptimized_stays_deoptimized() {
    let mut session = Session::new();
    let unit = define(&mut session, "function f(a) { return a + 1; }");
    session.eval("f(1); f(2); f('x');");
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
    for i in 0..20 {
        assert_eq!(session.eval(&format!("f({});", i)), Value::Int(i + 1));
    }
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
    assert_eq!(unit.deopt_count(), 1);
}

#[test]
fn test_deopt_on_first_execution() {
    let mut session = Session::new();
    let unit = define(&mut session, "function f(a) { return a + 1; }");
    assert_eq!(session.eval("f('s');"), Value::from("s1"));
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
}

#[test]
fn test_speculations_are_independent() {
    let mut session = Session::new();
    let unit = define(&mut session, "function g(a, b) { return (a + 1) + (b + 1); }");
    assert_eq!(session.eval("g(1, 'x');"), Value::from("2x1"));
    let states = unit.speculation_states();
    assert_eq!(states.len(), 3);
    assert!(matches!(states[0], SpecState::Speculating(_)));
    assert_eq!(states[1], SpecState::Deoptimized);
    assert_eq!(states[2], SpecState::Deoptimized);
    assert_eq!(unit.deopt_count(), 2);
}

// ============================================================================
// Guard Failures Beyond Type
// ============================================================================

#[test]
fn test_overflow_deoptimizes_and_widens() {
    let mut session = Session::new();
    let unit = define(&mut session, "function inc(a) { return a + 1; }");
    assert_eq!(session.eval("inc(1);"), Value::Int(2));
    assert_eq!(session.eval("inc(2147483647);"), Value::Number(2147483648.0));
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
}

#[test]
fn test_negative_zero_product_deoptimizes() {
    let mut session = Session::new();
    let unit = define(&mut session, "function mul(a, b) { return a * b; }");
    assert_eq!(session.eval("mul(2, 3);"), Value::Int(6));
    assert_eq!(session.eval("1 / mul(0, -1);"), Value::Number(f64::NEG_INFINITY));
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
}

#[test]
fn test_inexact_division_is_number_speculation() {
    let mut session = Session::new();
    let unit = define(&mut session, "function half(a) { return a / 2; }");
    assert_eq!(session.eval("half(3);"), Value::Number(1.5));
    assert!(matches!(unit.speculation_states()[0], SpecState::Speculating(_)));
    assert_eq!(session.eval("half('8');"), Value::Int(4));
    assert_eq!(unit.speculation_states(), vec![SpecState::Deoptimized]);
}

// ============================================================================
// Without Speculation
// ============================================================================

#[test]
fn test_pessimistic_compile_has_no_speculations() {
    let mut session = Session::new();
    let options = CompileOptions {
        optimistic_types: false,
        ..CompileOptions::default()
    };
    let unit = session
        .engine
        .compile("function f(a) { return a + 1; } f(1) + f('x');", &options)
        .expect("compile");
    assert_eq!(unit.module().speculation_count, 0);
    assert_eq!(session.run(&unit).expect("run"), Value::from("2x1"));
    assert_eq!(unit.deopt_count(), 0);
}

#[test]
fn test_results_match_with_and_without_speculation() {
    let source = "function poly(a, b) { return a * b + a / b - (a % b); }
                  var out = [];
                  var inputs = [[6, 3], [7, 2], [2147483647, 2], ['9', 3], [-4, 2], [0, -5]];
                  for (var i = 0; i < inputs.length; i++) { out.push(poly(inputs[i][0], inputs[i][1])); }
                  out.join(',');";
    let mut optimistic = Session::new();
    let expected = optimistic.eval(source);
    let mut pessimistic = Session::new();
    let options = CompileOptions {
        optimistic_types: false,
        ..CompileOptions::default()
    };
    let unit = pessimistic.engine.compile(source, &options).expect("compile");
    assert_eq!(pessimistic.run(&unit).expect("run"), expected);
}
