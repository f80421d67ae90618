//! Sharing one engine across threads, cancellation and deadlines.

use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::harness::*;
use tern_engine::{
    CompileOptions, Engine, EngineOptions, ErrorKind, HostError, HostObject, InterruptHandle, Value,
};

// ============================================================================
// Shared Engine
// ============================================================================

#[test]
fn test_engine_is_shared_across_threads() {
    let engine = Arc::new(Engine::default());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let source = format!(
                    "function P(x) {{ this.x = x; this.y = {n}; }}
                     var total = 0;
                     for (var i = 0; i < 100; i++) {{ var p = new P(i); total += p.x + p.y; }}
                     total;"
                );
                let unit = engine.compile(&source, &CompileOptions::default()).expect("compile");
                let mut context = engine.new_context();
                engine.execute(&unit, &mut context).expect("run").as_number()
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        let total = handle.join().expect("thread finished");
        assert_eq!(total, Some(4950.0 + 100.0 * n as f64));
    }
}

#[test]
fn test_contexts_are_isolated() {
    let engine = Engine::default();
    let unit = engine
        .compile_script("var counter = (typeof counter === 'number' ? counter : 0) + 1; counter;")
        .expect("compile");
    let mut first = engine.new_context();
    let mut second = engine.new_context();
    engine.execute(&unit, &mut first).expect("run");
    assert_eq!(engine.execute(&unit, &mut first).expect("run"), Value::Int(2));
    assert_eq!(engine.execute(&unit, &mut second).expect("run"), Value::Int(1));
}

// ============================================================================
// Interruption
// ============================================================================

#[test]
fn test_interrupt_from_another_thread() {
    let mut session = Session::new();
    let handle = session.context.interrupt_handle();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let unit = session.compile("var n = 0; while (true) { n++; }");
    let err = session.run(&unit).expect_err("loop is interrupted");
    interrupter.join().expect("interrupter finished");
    assert_eq!(err.kind, ErrorKind::Interrupted);
    assert_eq!(err.message, "execution was interrupted");
}

#[test]
fn test_interrupt_stops_recursion_without_loops() {
    let mut session = Session::new();
    let handle = session.context.interrupt_handle();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let unit = session.compile(
        "function spin(n) { return n > 100 ? 0 : spin(n + 1) + spin(n + 2); }
         for (;;) { spin(0); }",
    );
    let err = session.run(&unit).expect_err("interrupted");
    interrupter.join().expect("interrupter finished");
    assert_eq!(err.kind, ErrorKind::Interrupted);
}

/// Host function that interrupts its own execution when called.
struct Stop(InterruptHandle);

impl HostObject for Stop {
    fn is_callable(&self) -> bool {
        true
    }

    fn invoke(&self, _this: &Value, _args: &[Value]) -> Result<Value, HostError> {
        self.0.interrupt();
        Ok(Value::Undefined)
    }
}

#[test]
fn test_interrupt_skips_script_handlers() {
    let mut session = Session::new();
    let stop = Stop(session.context.interrupt_handle());
    session.context.define_host_object("stop", Rc::new(stop));
    let unit = session.compile(
        "var ran = false;
         try { stop(); for (;;) {} } catch (e) { ran = true; } finally { ran = true; }",
    );
    let err = session.run(&unit).expect_err("interrupted");
    assert_eq!(err.kind, ErrorKind::Interrupted);
    assert_eq!(session.global("ran"), Value::Boolean(false));
}

#[test]
fn test_context_is_reusable_after_interrupt() {
    let mut session = Session::new();
    let handle = session.context.interrupt_handle();
    handle.interrupt();
    let unit = session.compile("var x = 1; while (true) {}");
    assert!(session.run(&unit).is_err());
    assert!(!handle.is_interrupted());
    assert_eq!(session.eval("40 + 2;"), Value::Int(42));
}

// ============================================================================
// Deadlines
// ============================================================================

#[test]
fn test_timeout_stops_infinite_loop() {
    let options = EngineOptions {
        execution_timeout_ms: Some(50),
        ..EngineOptions::default()
    };
    match compile_and_run_with("while (true) {}", options) {
        Err(E2EError::Runtime(e)) => {
            assert_eq!(e.kind, ErrorKind::Interrupted);
            assert_eq!(e.message, "execution timed out");
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn test_timeout_leaves_fast_scripts_alone() {
    let options = EngineOptions {
        execution_timeout_ms: Some(5_000),
        ..EngineOptions::default()
    };
    let value = compile_and_run_with("var s = 0; for (var i = 0; i < 1000; i++) { s += i; } s;", options)
        .expect("finishes in time");
    assert_eq!(value, Value::Int(499500));
}

#[test]
fn test_call_function_from_host() {
    let mut session = Session::new();
    session.eval("function square(x) { return x * x; }");
    let square = session.global("square");
    let result = session
        .engine
        .call_function(&mut session.context, &square, Value::Undefined, &[Value::Int(7)])
        .expect("call");
    assert_eq!(result, Value::Int(49));
}
