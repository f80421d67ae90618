//! Inline caching for member accesses and calls.
//!
//! Every `GetProperty`/`SetProperty`/`GetElement`/`SetElement`/`Call`/`New`
//! instruction owns a [`DispatchSite`]. A site starts unlinked; each miss
//! asks the linker for a guarded entry and the policy in [`Linker`] decides
//! whether the site stays monomorphic, widens to polymorphic or gives up
//! and turns megamorphic.

pub mod linker;
pub mod site;

use std::sync::Arc;

pub use linker::{resolve_call, resolve_get, resolve_set, Linker, Resolution};
pub use site::{Access, CallTarget, DispatchSite, Guard, Probe, SiteEntry, SiteSnapshot, SiteState, SiteStats, Target};

use crate::compiler::ir::SiteId;

/// A site changed state (or relinked its single entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTransition {
    /// Compiled unit owning the site
    pub unit: u64,
    pub site: SiteId,
    /// Display form of the site kind, e.g. `property .x`
    pub site_kind: String,
    pub line: u32,
    pub from: SiteState,
    pub to: SiteState,
    /// Entries after the transition
    pub entries: usize,
}

/// Callback receiving every site transition.
pub type DiagnosticsHook = Arc<dyn Fn(&SiteTransition) + Send + Sync>;
