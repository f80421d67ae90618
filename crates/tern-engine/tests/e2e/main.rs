//! End-to-end tests for the Tern engine
//!
//! These tests compile script source and execute it, verifying results,
//! errors and the runtime state (dispatch sites, speculation) left behind.

mod harness;
mod scenarios;
mod syntax;
mod statements;
mod operators;
mod coercion;
mod functions;
mod objects;
mod exceptions;
mod builtins;
mod dispatch;
mod deopt;
mod host;
mod concurrency;
