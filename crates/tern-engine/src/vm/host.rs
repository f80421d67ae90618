//! Host object capability interface.
//!
//! Embedders expose native data to scripts by implementing [`HostObject`]
//! and installing it with `Context::define_host_object`. Every capability
//! has a default that reports it missing; scripts see that as a
//! `TypeError`. Accesses on host objects always take the generic path and
//! never change dispatch-site state.

use std::fmt;

use thiserror::Error;

use super::value::Value;

/// Failure of a host capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host object does not implement the capability
    #[error("host object does not support {0}")]
    Unsupported(&'static str),

    /// The capability ran and failed
    #[error("{0}")]
    Failed(String),
}

/// Capabilities a host object may provide.
pub trait HostObject {
    /// Class tag reported by `Object.prototype.toString`.
    fn class_name(&self) -> &str {
        "HostObject"
    }

    /// Whether the object itself answers for `key`. When false, lookup
    /// continues on its prototype.
    fn has_property(&self, key: &str) -> bool {
        let _ = key;
        false
    }

    fn get_property(&self, key: &str) -> Result<Value, HostError> {
        let _ = key;
        Err(HostError::Unsupported("property reads"))
    }

    fn set_property(&self, key: &str, value: Value) -> Result<(), HostError> {
        let _ = (key, value);
        Err(HostError::Unsupported("property writes"))
    }

    /// Call the object as a function.
    fn invoke(&self, this: &Value, args: &[Value]) -> Result<Value, HostError> {
        let _ = (this, args);
        Err(HostError::Unsupported("calls"))
    }

    fn is_callable(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class_name())
            .finish()
    }
}
