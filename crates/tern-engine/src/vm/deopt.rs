//! Speculation states.
//!
//! Each speculative instruction owns one entry. The first successful run
//! moves it to `Speculating`, the second to `Confirmed`. A failed guard
//! moves it to `Deoptimized` for good: from then on the instruction only
//! runs its generic form.

use std::fmt;

use crate::analysis::OptType;
use crate::compiler::ir::SpecId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecState {
    Unexecuted,
    Speculating(OptType),
    Confirmed(OptType),
    Deoptimized,
}

impl fmt::Display for SpecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecState::Unexecuted => write!(f, "unexecuted"),
            SpecState::Speculating(ty) => write!(f, "speculating({})", ty),
            SpecState::Confirmed(ty) => write!(f, "confirmed({})", ty),
            SpecState::Deoptimized => write!(f, "deoptimized"),
        }
    }
}

/// Deoptimization state of every speculation in a unit.
#[derive(Debug, Clone)]
pub struct SpeculationTable {
    states: Vec<SpecState>,
    deopts: usize,
}

impl SpeculationTable {
    pub fn new(count: usize) -> Self {
        Self {
            states: vec![SpecState::Unexecuted; count],
            deopts: 0,
        }
    }

    pub fn state(&self, id: SpecId) -> Option<SpecState> {
        self.states.get(id.0 as usize).copied()
    }

    /// Whether the fast path may still be tried.
    #[inline]
    pub fn is_live(&self, id: SpecId) -> bool {
        !matches!(self.states.get(id.0 as usize), Some(SpecState::Deoptimized) | None)
    }

    pub fn record_success(&mut self, id: SpecId, ty: OptType) {
        if let Some(state) = self.states.get_mut(id.0 as usize) {
            *state = match *state {
                SpecState::Unexecuted => SpecState::Speculating(ty),
                SpecState::Speculating(_) | SpecState::Confirmed(_) => SpecState::Confirmed(ty),
                SpecState::Deoptimized => SpecState::Deoptimized,
            };
        }
    }

    pub fn record_failure(&mut self, id: SpecId) {
        if let Some(state) = self.states.get_mut(id.0 as usize) {
            if *state != SpecState::Deoptimized {
                log::trace!("deoptimized {} (was {})", id, state);
                *state = SpecState::Deoptimized;
                self.deopts += 1;
            }
        }
    }

    /// Speculations that have deoptimized.
    pub fn deopt_count(&self) -> usize {
        self.deopts
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
