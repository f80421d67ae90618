//! Test harness for end-to-end compilation and execution
//!
//! Compiles script source with a fresh [`Engine`] and runs it in a fresh
//! [`Context`], returning the completion value of the script.

#![allow(dead_code)]

use tern_engine::{
    CompileError, CompileOptions, CompiledUnit, Context, Engine, EngineOptions, ErrorKind, RuntimeError, Value,
};

/// Error type for e2e tests
#[derive(Debug)]
pub enum E2EError {
    /// Syntax or early reference error
    Compile(CompileError),
    /// Uncaught exception or interruption
    Runtime(RuntimeError),
}

impl std::fmt::Display for E2EError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            E2EError::Compile(e) => write!(f, "Compile error: {}", e),
            E2EError::Runtime(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for E2EError {}

/// Result type for e2e tests
pub type E2EResult<T> = Result<T, E2EError>;

/// An engine, a context and the unit last compiled into them, for tests
/// that inspect runtime state after running.
pub struct Session {
    pub engine: Engine,
    pub context: Context,
}

impl Session {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let engine = Engine::new(options).expect("valid engine options");
        let context = engine.new_context();
        Self { engine, context }
    }

    pub fn compile(&self, source: &str) -> CompiledUnit {
        self.engine
            .compile(source, &CompileOptions::default())
            .unwrap_or_else(|e| panic!("Compilation failed: {}\nSource:\n{}", e, source))
    }

    pub fn run(&mut self, unit: &CompiledUnit) -> Result<Value, RuntimeError> {
        self.engine.execute(unit, &mut self.context)
    }

    /// Compile and run, panicking on any error.
    pub fn eval(&mut self, source: &str) -> Value {
        let unit = self.compile(source);
        self.run(&unit)
            .unwrap_or_else(|e| panic!("Execution failed: {}\nSource:\n{}", e.format_with_trace(), source))
    }

    pub fn global(&self, name: &str) -> Value {
        self.context
            .get_global(name)
            .unwrap_or_else(|| panic!("global '{}' is not a data property", name))
    }
}

/// Compile source with default options
pub fn compile(source: &str) -> E2EResult<CompiledUnit> {
    Engine::default()
        .compile(source, &CompileOptions::default())
        .map_err(E2EError::Compile)
}

/// Compile and execute source in a fresh context, returning the
/// completion value
pub fn compile_and_run(source: &str) -> E2EResult<Value> {
    compile_and_run_with(source, EngineOptions::default())
}

pub fn compile_and_run_with(source: &str, options: EngineOptions) -> E2EResult<Value> {
    let engine = Engine::new(options).expect("valid engine options");
    let unit = engine
        .compile(source, &engine.options().compile_options())
        .map_err(E2EError::Compile)?;
    let mut context = engine.new_context();
    engine.execute(&unit, &mut context).map_err(E2EError::Runtime)
}

fn run_ok(source: &str) -> Value {
    match compile_and_run(source) {
        Ok(value) => value,
        Err(e) => panic!("Compilation/execution failed: {}\nSource:\n{}", e, source),
    }
}

/// Compile and execute, expecting a specific i32 result. Whole-number
/// doubles are accepted too.
pub fn expect_i32(source: &str, expected: i32) {
    let value = run_ok(source);
    match value.as_number() {
        Some(actual) => assert_eq!(
            actual,
            expected as f64,
            "Wrong result for:\n{}",
            source
        ),
        None => panic!("Expected number result, got {:?}\nSource:\n{}", value, source),
    }
}

/// Compile and execute, expecting a specific f64 result
pub fn expect_f64(source: &str, expected: f64) {
    let value = run_ok(source);
    let actual = value
        .as_number()
        .unwrap_or_else(|| panic!("Expected number result, got {:?}\nSource:\n{}", value, source));
    if expected.is_nan() {
        assert!(actual.is_nan(), "Expected NaN, got {} for:\n{}", actual, source);
    } else if expected.is_infinite() || actual == expected {
        assert_eq!(actual, expected, "Wrong result for:\n{}", source);
    } else {
        assert!(
            (actual - expected).abs() < 1e-10,
            "Expected {}, got {} for:\n{}",
            expected,
            actual,
            source
        );
    }
}

/// Compile and execute, expecting a specific boolean result
pub fn expect_bool(source: &str, expected: bool) {
    let value = run_ok(source);
    assert_eq!(value.as_bool(), Some(expected), "Wrong result {:?} for:\n{}", value, source);
}

/// Compile and execute, expecting a specific string result
pub fn expect_string(source: &str, expected: &str) {
    let value = run_ok(source);
    assert_eq!(
        value.as_str(),
        Some(expected),
        "String mismatch.\nExpected: '{}'\nGot: {:?}\nSource:\n{}",
        expected,
        value,
        source
    );
}

pub fn expect_undefined(source: &str) {
    let value = run_ok(source);
    assert!(value.is_undefined(), "Expected undefined, got {:?}\nSource:\n{}", value, source);
}

pub fn expect_null(source: &str) {
    let value = run_ok(source);
    assert!(matches!(value, Value::Null), "Expected null, got {:?}\nSource:\n{}", value, source);
}

/// Compile, expecting a compile error containing `error_pattern`
pub fn expect_compile_error(source: &str, error_pattern: &str) {
    match compile(source) {
        Ok(_) => panic!(
            "Expected compile error containing '{}', but compilation succeeded\nSource:\n{}",
            error_pattern, source
        ),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(error_pattern),
                "Expected error containing '{}', got: {}\nSource:\n{}",
                error_pattern,
                error_msg,
                source
            );
        }
    }
}

/// Compile and execute, expecting an uncaught error of `kind` whose
/// message contains `error_pattern`
pub fn expect_runtime_error(source: &str, kind: ErrorKind, error_pattern: &str) {
    match compile_and_run(source) {
        Ok(value) => panic!(
            "Expected runtime error containing '{}', but got {:?}\nSource:\n{}",
            error_pattern, value, source
        ),
        Err(E2EError::Runtime(e)) => {
            assert_eq!(e.kind, kind, "Wrong error kind ({}) for:\n{}", e, source);
            assert!(
                e.message.contains(error_pattern),
                "Expected runtime error containing '{}', got: {}\nSource:\n{}",
                error_pattern,
                e,
                source
            );
        }
        Err(e) => panic!("Expected runtime error, got compile error: {}\nSource:\n{}", e, source),
    }
}
