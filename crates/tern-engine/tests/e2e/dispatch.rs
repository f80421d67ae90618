//! Dispatch sites: cache hits, widening, megamorphic give-up, the
//! diagnostics hook and compile determinism.

use std::sync::{Arc, Mutex};

use super::harness::*;
use tern_engine::{CompileOptions, EngineOptions, SiteState, SiteTransition, Value};

fn shapes_loop(shapes: usize, iterations: usize) -> String {
    let literals: Vec<String> = (0..shapes).map(|i| format!("{{ k{}: 0, x: {} }}", i, i)).collect();
    format!(
        "var objs = [{}];
         var sum = 0;
         for (var i = 0; i < {}; i++) {{ var o = objs[i % objs.length]; sum += o.x; }}
         sum;",
        literals.join(", "),
        iterations
    )
}

// ============================================================================
// Monomorphic
// ============================================================================

#[test]
fn test_monomorphic_site_resolves_once() {
    let mut session = Session::new();
    let unit = session.compile(&shapes_loop(1, 50));
    assert_eq!(session.run(&unit).expect("run"), Value::Int(0));
    let site = unit.find_site("property .x").expect("x site");
    assert_eq!(site.state, SiteState::Monomorphic);
    assert_eq!(site.entries, 1);
    assert_eq!(site.stats.resolutions, 1);
    assert_eq!(site.stats.hits, 49);
    assert_eq!(site.executions, 50);
}

#[test]
fn test_inherited_method_call_is_cached() {
    let mut session = Session::new();
    let unit = session.compile(
        "function P(v) { this.v = v; }
         P.prototype.get = function () { return this.v; };
         var total = 0;
         for (var i = 0; i < 20; i++) { total += new P(i).get(); }
         total;",
    );
    assert_eq!(session.run(&unit).expect("run"), Value::Int(190));
    let site = unit.find_site("property .get").expect("get site");
    assert_eq!(site.state, SiteState::Monomorphic);
    assert_eq!(site.stats.resolutions, 1);
}

#[test]
fn test_call_site_caches_callee() {
    let mut session = Session::new();
    let unit = session.compile("function f() { return 1; } var n = 0; for (var i = 0; i < 10; i++) { n += f(); } n;");
    assert_eq!(session.run(&unit).expect("run"), Value::Int(10));
    let site = unit.find_site("call").expect("call site");
    assert_eq!(site.state, SiteState::Monomorphic);
    assert_eq!(site.stats.resolutions, 1);
    assert_eq!(site.stats.hits, 9);
}

// ============================================================================
// Polymorphic and Megamorphic
// ============================================================================

#[test]
fn test_sites_widen_up_to_fanout() {
    let mut session = Session::new();
    let unit = session.compile(&shapes_loop(4, 100));
    session.run(&unit).expect("run");
    let site = unit.find_site("property .x").expect("x site");
    assert_eq!(site.state, SiteState::Polymorphic);
    assert_eq!(site.entries, 4);
    assert_eq!(site.stats.resolutions, 4);
    assert_eq!(site.stats.hits, 96);
}

#[test]
fn test_too_many_shapes_go_megamorphic() {
    let mut session = Session::new();
    let unit = session.compile(&shapes_loop(5, 100));
    assert_eq!(session.run(&unit).expect("run"), Value::Int(200));
    let site = unit.find_site("property .x").expect("x site");
    assert_eq!(site.state, SiteState::Megamorphic);
    assert_eq!(site.entries, 0);
    assert_eq!(site.stats.resolutions, 5);
    assert_eq!(site.stats.generic, 95);
}

#[test]
fn test_megamorphic_is_final() {
    let mut session = Session::new();
    let unit = session.compile(&shapes_loop(5, 10));
    session.run(&unit).expect("first run");
    let before = unit.find_site("property .x").expect("x site");
    session.run(&unit).expect("second run");
    let after = unit.find_site("property .x").expect("x site");
    assert_eq!(after.state, SiteState::Megamorphic);
    assert_eq!(after.stats.resolutions, before.stats.resolutions);
}

#[test]
fn test_fanout_is_configurable() {
    let options = EngineOptions {
        polymorphic_fanout: 2,
        ..EngineOptions::default()
    };
    let mut session = Session::with_options(options);
    let unit = session.compile(&shapes_loop(3, 30));
    session.run(&unit).expect("run");
    let site = unit.find_site("property .x").expect("x site");
    assert_eq!(site.state, SiteState::Megamorphic);
    assert_eq!(site.stats.resolutions, 3);
}

#[test]
fn test_fanout_of_one_skips_polymorphic() {
    let options = EngineOptions {
        polymorphic_fanout: 1,
        ..EngineOptions::default()
    };
    let mut session = Session::with_options(options);
    let unit = session.compile(&shapes_loop(2, 10));
    session.run(&unit).expect("run");
    assert_eq!(
        unit.find_site("property .x").expect("x site").state,
        SiteState::Megamorphic
    );
}

// ============================================================================
// Diagnostics Hook
// ============================================================================

#[test]
fn test_hook_reports_each_transition() {
    let mut session = Session::new();
    let seen: Arc<Mutex<Vec<SiteTransition>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.engine.set_diagnostics_hook(move |t| sink.lock().unwrap().push(t.clone()));

    let unit = session.compile(&shapes_loop(5, 20));
    session.run(&unit).expect("run");

    let seen = seen.lock().unwrap();
    let states: Vec<(SiteState, SiteState)> = seen
        .iter()
        .filter(|t| t.site_kind == "property .x")
        .map(|t| (t.from, t.to))
        .collect();
    assert_eq!(
        states,
        vec![
            (SiteState::Unlinked, SiteState::Monomorphic),
            (SiteState::Monomorphic, SiteState::Polymorphic),
            (SiteState::Polymorphic, SiteState::Polymorphic),
            (SiteState::Polymorphic, SiteState::Polymorphic),
            (SiteState::Polymorphic, SiteState::Megamorphic),
        ]
    );
    let last = seen.iter().rev().find(|t| t.site_kind == "property .x").expect("x transition");
    assert_eq!(last.unit, unit.id());
    assert_eq!(last.entries, 0);
    assert_eq!(last.line, 3);
}

#[test]
fn test_cleared_hook_stops_reporting() {
    let mut session = Session::new();
    let count = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&count);
    session.engine.set_diagnostics_hook(move |_| *sink.lock().unwrap() += 1);
    session.engine.clear_diagnostics_hook();
    session.eval("var o = { x: 1 }; o.x;");
    assert_eq!(*count.lock().unwrap(), 0);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let session = Session::new();
    let source = "function f(a, b) { var o = { a: a }; o.b = b; return o.a + o.b + g(a); }
                  function g(x) { return x * 2; }
                  f(1, 2);";
    let options = CompileOptions::default();
    let first = session.engine.compile_module(source, &options).expect("compile");
    let second = session.engine.compile_module(source, &options).expect("compile");
    assert_eq!(first, second);
    assert_eq!(session.compile(source).pretty_ir(), session.compile(source).pretty_ir());
}

#[test]
fn test_units_get_fresh_site_state() {
    let mut session = Session::new();
    let source = shapes_loop(5, 10);
    let first = session.compile(&source);
    session.run(&first).expect("run");
    let second = session.compile(&source);
    assert_eq!(
        second.find_site("property .x").expect("x site").state,
        SiteState::Unlinked
    );
}
