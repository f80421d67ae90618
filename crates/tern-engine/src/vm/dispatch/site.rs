//! Dispatch sites: guarded MRU caches attached to member-access and call
//! instructions.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::compiler::ir::{FunctionId, SiteId, SiteInfo, SiteKind};
use crate::vm::object::{ObjectId, ObjectRef};
use crate::vm::shape::{Shape, ShapeId};

/// Caching state of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteState {
    Unlinked,
    Monomorphic,
    Polymorphic,
    /// Too many receivers seen; the site stays generic for good
    Megamorphic,
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteState::Unlinked => "unlinked",
            SiteState::Monomorphic => "monomorphic",
            SiteState::Polymorphic => "polymorphic",
            SiteState::Megamorphic => "megamorphic",
        };
        f.write_str(name)
    }
}

/// What the instruction does at the site. Compound assignments read and
/// write through the same site, so entries are tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Get,
    Set,
    Call,
}

/// Condition under which an entry applies.
#[derive(Debug, Clone)]
pub enum Guard {
    /// Receiver shape, the key for element sites, and the shape of every
    /// prototype the resolution looked at. Holding the receiver shape keeps
    /// it in the shape table while the site caches it.
    Shape {
        access: Access,
        shape: Arc<Shape>,
        key: Option<Rc<str>>,
        chain: Box<[(ObjectRef, ShapeId)]>,
    },
    /// Identity of the called function
    Callee { access: Access, id: ObjectId },
}

/// What a site is about to dispatch on.
#[derive(Debug, Clone, Copy)]
pub enum Probe<'a> {
    Shape {
        access: Access,
        shape: ShapeId,
        key: Option<&'a str>,
    },
    Callee {
        access: Access,
        id: ObjectId,
    },
}

impl Guard {
    pub fn matches(&self, probe: &Probe<'_>) -> bool {
        match (self, probe) {
            (
                Guard::Shape {
                    access,
                    shape,
                    key,
                    chain,
                },
                Probe::Shape {
                    access: probe_access,
                    shape: probe_shape,
                    key: probe_key,
                },
            ) => {
                access == probe_access
                    && shape.id() == *probe_shape
                    && key.as_deref() == *probe_key
                    && chain.iter().all(|(proto, id)| proto.shape_id() == *id)
            }
            (Guard::Callee { access, id }, Probe::Callee { access: a, id: i }) => access == a && id == i,
            _ => false,
        }
    }
}

/// Cached resolution of a site.
#[derive(Debug, Clone)]
pub enum Target {
    /// Data slot on the receiver
    OwnSlot(u32),
    /// Data slot on a prototype
    ProtoSlot { holder: ObjectRef, slot: u32 },
    /// Accessor slot on the receiver (`holder` is `None`) or a prototype
    Getter { holder: Option<ObjectRef>, slot: u32 },
    Setter { holder: Option<ObjectRef>, slot: u32 },
    /// Nowhere on the chain
    Absent,
    /// Writable data slot on the receiver
    OwnWrite(u32),
    /// New property: move the receiver to `shape` and append a slot
    TransitionAdd { shape: Arc<Shape>, slot: u32 },
    Callee(CallTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Script(FunctionId),
    Native(&'static str),
}

#[derive(Debug, Clone)]
pub struct SiteEntry {
    pub guard: Guard,
    pub target: Target,
    /// Execution count at the entry's last hit (or install)
    pub last_hit: u64,
}

/// Instrumentation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStats {
    /// Executions served by a cached entry
    pub hits: u64,
    /// Probes that found no matching entry
    pub misses: u64,
    /// Entries resolved by the linker
    pub resolutions: u64,
    /// Executions that bypassed the cache (megamorphic site, primitive or
    /// host receiver, array element)
    pub generic: u64,
}

/// Point-in-time view of a site, for tests and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSnapshot {
    pub id: SiteId,
    pub kind: SiteKind,
    pub line: u32,
    pub state: SiteState,
    pub entries: usize,
    pub executions: u64,
    pub stats: SiteStats,
}

pub struct DispatchSite {
    pub(super) id: SiteId,
    pub(super) kind: SiteKind,
    pub(super) line: u32,
    pub(super) state: SiteState,
    pub(super) entries: Vec<SiteEntry>,
    pub(super) stats: SiteStats,
    pub(super) executions: u64,
}

impl DispatchSite {
    pub fn new(info: &SiteInfo) -> Self {
        Self {
            id: info.id,
            kind: info.kind.clone(),
            line: info.line,
            state: SiteState::Unlinked,
            entries: Vec::new(),
            stats: SiteStats::default(),
            executions: 0,
        }
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    pub fn state(&self) -> SiteState {
        self.state
    }

    pub fn entries(&self) -> &[SiteEntry] {
        &self.entries
    }

    pub fn stats(&self) -> SiteStats {
        self.stats
    }

    /// Count one execution. Returns false when the site is megamorphic
    /// and the caller must go generic.
    #[inline]
    pub fn enter(&mut self) -> bool {
        self.executions += 1;
        if self.state == SiteState::Megamorphic {
            self.stats.generic += 1;
            return false;
        }
        true
    }

    /// Record an execution that could not use the cache.
    pub fn note_generic(&mut self) {
        self.stats.generic += 1;
    }

    /// Find the entry guarding `probe`, moving it to the front.
    pub fn lookup(&mut self, probe: &Probe<'_>) -> Option<Target> {
        let Some(position) = self.entries.iter().position(|e| e.guard.matches(probe)) else {
            self.stats.misses += 1;
            return None;
        };
        self.stats.hits += 1;
        self.entries[..=position].rotate_right(1);
        let entry = &mut self.entries[0];
        entry.last_hit = self.executions;
        Some(entry.target.clone())
    }

    pub fn snapshot(&self) -> SiteSnapshot {
        SiteSnapshot {
            id: self.id,
            kind: self.kind.clone(),
            line: self.line,
            state: self.state,
            entries: self.entries.len(),
            executions: self.executions,
            stats: self.stats,
        }
    }
}

impl fmt::Debug for DispatchSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSite")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}
