//! Engine configuration.
//!
//! Options can be built in code or loaded from a TOML document:
//!
//! ```toml
//! strict_mode = false
//! optimistic_types = true
//! polymorphic_fanout = 4
//! relink_window = 16
//! max_call_depth = 256
//! execution_timeout_ms = 500
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default option values.
pub mod defaults {
    /// Guarded entries a dispatch site keeps before going megamorphic.
    pub const DEFAULT_POLYMORPHIC_FANOUT: usize = 4;

    /// Executions after which an unused monomorphic entry is considered
    /// stale and may be replaced instead of escalating the site.
    pub const DEFAULT_RELINK_WINDOW: u64 = 16;

    /// Script call frames allowed before a `RangeError` is thrown.
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

    /// Syntactic nesting allowed before the parser gives up.
    pub const DEFAULT_MAX_PARSE_DEPTH: usize = 96;
}

/// Errors raised while loading options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document is malformed or has wrongly typed fields
    #[error("Failed to parse engine options: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("Invalid engine options: {0}")]
    Invalid(String),
}

/// Engine-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Compile every script as strict code.
    pub strict_mode: bool,
    /// Emit speculative integer arithmetic.
    pub optimistic_types: bool,
    pub polymorphic_fanout: usize,
    pub relink_window: u64,
    pub max_call_depth: usize,
    pub max_parse_depth: usize,
    /// Wall-clock budget for a single `execute` call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_timeout_ms: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            optimistic_types: true,
            polymorphic_fanout: defaults::DEFAULT_POLYMORPHIC_FANOUT,
            relink_window: defaults::DEFAULT_RELINK_WINDOW,
            max_call_depth: defaults::DEFAULT_MAX_CALL_DEPTH,
            max_parse_depth: defaults::DEFAULT_MAX_PARSE_DEPTH,
            execution_timeout_ms: None,
        }
    }
}

impl EngineOptions {
    /// Parse options from TOML; missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: EngineOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polymorphic_fanout == 0 {
            return Err(ConfigError::Invalid("polymorphic_fanout must be at least 1".to_string()));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be at least 1".to_string()));
        }
        if self.max_parse_depth < 8 {
            return Err(ConfigError::Invalid("max_parse_depth must be at least 8".to_string()));
        }
        Ok(())
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }

    /// Compile options matching these engine options.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict_mode: self.strict_mode,
            optimistic_types: self.optimistic_types,
        }
    }
}

/// Per-compilation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub strict_mode: bool,
    pub optimistic_types: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            optimistic_types: true,
        }
    }
}
