//! Tern Script Engine
//!
//! An ECMAScript 5.1-class engine built around optimistic compilation and
//! inline caching:
//! - **Parser**: lexer and recursive-descent parser (`parser` module)
//! - **Analysis**: scope resolution and optimistic typing (`analysis` module)
//! - **Compiler**: lowering to a register IR with dispatch sites and
//!   speculation points (`compiler` module)
//! - **VM**: shapes, dispatch-site linking, sticky deoptimization and the
//!   executor (`vm` module)
//!
//! Most embedders only need [`Engine`], [`Context`] and [`CompiledUnit`].

#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]

// ============================================================================
// Core Modules
// ============================================================================

/// Lexer, AST and parser
pub mod parser;

/// Name resolution and optimistic type analysis
pub mod analysis;

/// IR and lowering
pub mod compiler;

/// Object model, dispatch sites and executor
pub mod vm;

/// Engine options
pub mod config;

/// Compile error rendering
pub mod diagnostic;

mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use compiler::{CompileError, CompileErrorKind};
pub use config::{CompileOptions, ConfigError, EngineOptions};
pub use engine::{CompiledUnit, Context, Engine};
pub use vm::{
    ErrorKind, HostError, HostObject, InterruptHandle, RuntimeError, SiteSnapshot, SiteState, SiteTransition,
    SpecState, StackFrame, Value,
};
