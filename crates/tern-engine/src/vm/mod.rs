//! Runtime: object model, dispatch sites, speculation state and the
//! executor that runs lowered IR.
//!
//! Objects, contexts and compiled units are single-threaded (`Rc` and
//! `RefCell`). The shape table and the ids it hands out are shared
//! across threads.

pub mod builtins;
pub mod convert;
pub mod deopt;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod object;
pub mod realm;
pub mod safepoint;
pub mod shape;
pub mod unit;
pub mod value;

pub use deopt::{SpecState, SpeculationTable};
pub use dispatch::{DiagnosticsHook, SiteSnapshot, SiteState, SiteStats, SiteTransition};
pub use error::{ErrorKind, InterruptReason, RuntimeError, StackFrame, Thrown, VmResult};
pub use host::{HostError, HostObject};
pub use interpreter::Interpreter;
pub use object::{Heap, ObjectError, ObjectId, ObjectKind, ObjectRef, PropertyDescriptor};
pub use realm::Realm;
pub use safepoint::{InterruptHandle, Safepoint};
pub use shape::{PropertyAttrs, Shape, ShapeId, ShapeTable};
pub use unit::UnitCode;
pub use value::Value;
