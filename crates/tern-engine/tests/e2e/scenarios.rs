//! The reference scenarios every build of the engine must reproduce.

use super::harness::*;
use tern_engine::{CompileOptions, Engine, ErrorKind, SiteState, SpecState, Value};

// ============================================================================
// Strict-mode undeclared assignment
// ============================================================================

#[test]
fn test_strict_undeclared_assignment_compiles() {
    assert!(compile("\"use strict\"; x = 1;").is_ok());
}

#[test]
fn test_strict_undeclared_assignment_throws_reference_error() {
    expect_runtime_error("\"use strict\"; x = 1;", ErrorKind::ReferenceError, "x is not defined");
}

#[test]
fn test_sloppy_undeclared_assignment_creates_global() {
    let mut session = Session::new();
    session.eval("x = 1;");
    assert_eq!(session.global("x"), Value::Int(1));
}

// ============================================================================
// Optimistic add, then deoptimization
// ============================================================================

#[test]
fn test_add_speculates_then_deoptimizes() {
    let mut session = Session::new();
    let definition = session.compile("function f(a) { return a + 1; }");
    session.run(&definition).expect("define f");
    assert_eq!(definition.module().speculation_count, 1);
    assert_eq!(definition.speculation_states(), vec![SpecState::Unexecuted]);

    assert_eq!(session.eval("f(1);"), Value::Int(2));
    assert!(matches!(definition.speculation_states()[0], SpecState::Speculating(_)));

    assert_eq!(session.eval("f(2);"), Value::Int(3));
    assert!(matches!(definition.speculation_states()[0], SpecState::Confirmed(_)));
    assert_eq!(definition.deopt_count(), 0);

    assert_eq!(session.eval("f('x');"), Value::from("x1"));
    assert_eq!(definition.speculation_states(), vec![SpecState::Deoptimized]);
    assert_eq!(definition.deopt_count(), 1);
}

#[test]
fn test_add_scenario_in_one_script() {
    expect_string(
        "function f(a){ return a+1; } var r = [f(1), f(2), f(\"x\")]; r.join(',');",
        "2,3,x1",
    );
}

// ============================================================================
// Shape transitions are shared
// ============================================================================

#[test]
fn test_same_construction_reaches_same_shape() {
    let mut session = Session::new();
    session.eval("var first = {a: 1}; first.b = 2; var second = {a: 1}; second.b = 2;");
    let first = session.global("first");
    let second = session.global("second");
    let (Some(first), Some(second)) = (first.as_object(), second.as_object()) else {
        panic!("expected two objects");
    };
    assert_eq!(first.shape_id(), second.shape_id());
}

#[test]
fn test_second_construction_reuses_transitions() {
    let mut session = Session::new();
    session.eval("var second; var first = {a: 1}; first.b = 2;");
    let before = session.engine.shape_table().transition_count();
    session.eval("second = {a: 1}; second.b = 2;");
    assert_eq!(session.engine.shape_table().transition_count(), before);
}

#[test]
fn test_dropped_contexts_release_their_shapes() {
    let engine = Engine::default();
    let unit = engine
        .compile(
            "for (var i = 0; i < 2000; i++) { new (function () {})().x = i; }",
            &CompileOptions::default(),
        )
        .expect("compiles");
    let mut after_each = Vec::new();
    for _ in 0..2 {
        let mut context = engine.new_context();
        engine.execute(&unit, &mut context).expect("runs");
        drop(context);
        after_each.push(engine.shape_table().transition_count());
    }
    assert!(after_each[0] < 100, "shapes kept after first context: {}", after_each[0]);
    assert!(after_each[1] <= after_each[0], "shape count grew: {:?}", after_each);
}

#[test]
fn test_shapes_live_while_context_lives() {
    let mut session = Session::new();
    session.eval("var keep = []; for (var i = 0; i < 50; i++) { var o = new (function () {})(); o.x = i; keep.push(o); }");
    assert!(session.engine.shape_table().transition_count() >= 50);
}

#[test]
fn test_different_order_gives_different_shape() {
    let mut session = Session::new();
    session.eval("var p = {}; p.a = 1; p.b = 2; var q = {}; q.b = 2; q.a = 1;");
    let p = session.global("p");
    let q = session.global("q");
    assert_ne!(
        p.as_object().map(|o| o.shape_id()),
        q.as_object().map(|o| o.shape_id())
    );
}

// ============================================================================
// Alternating receivers stay polymorphic
// ============================================================================

#[test]
fn test_alternating_shapes_settle_polymorphic() {
    let mut session = Session::new();
    let unit = session.compile(
        "var objs = [{prop: 1}, {other: 0, prop: 2}];
         var sum = 0;
         for (var i = 0; i < 100; i++) { var obj = objs[i % 2]; sum += obj.prop; }
         sum;",
    );
    assert_eq!(session.run(&unit).expect("run"), Value::Int(150));
    let site = unit.find_site("property .prop").expect("prop site");
    assert_eq!(site.state, SiteState::Polymorphic);
    assert_eq!(site.entries, 2);
    assert_eq!(site.stats.resolutions, 2);
    assert_eq!(site.stats.hits, 98);
}

// ============================================================================
// Self-referential prototype
// ============================================================================

#[test]
fn test_self_prototype_is_type_error() {
    expect_runtime_error("var o = {}; o.__proto__ = o;", ErrorKind::TypeError, "Cyclic __proto__ value");
}

#[test]
fn test_self_prototype_leaves_prototype_unchanged() {
    expect_bool(
        "var o = {}; var caught = null;
         try { o.__proto__ = o; } catch (e) { caught = e; }
         caught instanceof TypeError && Object.getPrototypeOf(o) === Object.prototype;",
        true,
    );
}

#[test]
fn test_indirect_cycle_is_rejected() {
    expect_bool(
        "var a = {}; var b = Object.create(a); var ok = false;
         try { Object.setPrototypeOf(a, b); } catch (e) { ok = e instanceof TypeError; }
         ok && Object.getPrototypeOf(a) === Object.prototype && Object.getPrototypeOf(b) === a;",
        true,
    );
}
