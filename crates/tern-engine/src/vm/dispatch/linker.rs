//! The dynamic linker: resolves a site miss to a guarded target and
//! applies the caching policy.
//!
//! Resolution only inspects shapes and slots. It never runs script code;
//! getters and setters found here are invoked later by the interpreter.

use super::site::{Access, CallTarget, DispatchSite, Guard, SiteEntry, SiteState, Target};
use super::{DiagnosticsHook, SiteTransition};
use crate::vm::object::{FunctionKind, ObjectKind, ObjectRef};
use crate::vm::shape::{PropertyAttrs, ShapeId, ShapeTable};

/// A resolved, not yet installed entry.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub guard: Guard,
    pub target: Target,
}

/// Walk the prototypes of `receiver` looking for `key`. Returns the
/// visited prototypes with their shapes, and the hit if any. `None` when
/// some object on the way keeps `key` outside its shape.
fn walk_chain(receiver: &ObjectRef, key: &str) -> Option<(Vec<(ObjectRef, ShapeId)>, Option<(ObjectRef, u32, PropertyAttrs)>)> {
    let mut chain = Vec::new();
    let mut cursor = receiver.proto();
    while let Some(object) = cursor {
        let (found, shape, next) = {
            let body = object.borrow();
            if body.is_exotic_key(key) {
                return None;
            }
            (body.shape().lookup(key), body.shape().id(), body.proto().cloned())
        };
        chain.push((object.clone(), shape));
        if let Some((slot, attrs)) = found {
            return Some((chain, Some((object, slot, attrs))));
        }
        cursor = next;
    }
    Some((chain, None))
}

/// Resolve a read of `key` on `receiver`.
pub fn resolve_get(receiver: &ObjectRef, key: &str, key_guard: Option<&str>) -> Option<Resolution> {
    let (shape, own) = {
        let body = receiver.borrow();
        if body.is_exotic_key(key) {
            return None;
        }
        (body.shape().clone(), body.shape().lookup(key))
    };
    let (chain, target) = match own {
        Some((slot, attrs)) if attrs.is_accessor() => (Vec::new(), Target::Getter { holder: None, slot }),
        Some((slot, _)) => (Vec::new(), Target::OwnSlot(slot)),
        None => {
            let (chain, found) = walk_chain(receiver, key)?;
            let target = match found {
                Some((holder, slot, attrs)) if attrs.is_accessor() => Target::Getter {
                    holder: Some(holder),
                    slot,
                },
                Some((holder, slot, _)) => Target::ProtoSlot { holder, slot },
                None => Target::Absent,
            };
            (chain, target)
        }
    };
    Some(Resolution {
        guard: Guard::Shape {
            access: Access::Get,
            shape,
            key: key_guard.map(Into::into),
            chain: chain.into_boxed_slice(),
        },
        target,
    })
}

/// Resolve a write of `key` on `receiver`. Writes that must fail (read-only
/// or non-extensible) are left to the generic path.
pub fn resolve_set(shapes: &ShapeTable, receiver: &ObjectRef, key: &str, key_guard: Option<&str>) -> Option<Resolution> {
    let (shape, own, extensible) = {
        let body = receiver.borrow();
        if body.is_exotic_key(key) {
            return None;
        }
        (body.shape().clone(), body.shape().lookup(key), body.is_extensible())
    };
    let (chain, target) = match own {
        Some((slot, attrs)) if attrs.is_accessor() => (Vec::new(), Target::Setter { holder: None, slot }),
        Some((slot, attrs)) if attrs.writable() => (Vec::new(), Target::OwnWrite(slot)),
        Some(_) => return None,
        None => {
            let (chain, found) = walk_chain(receiver, key)?;
            match found {
                Some((holder, slot, attrs)) if attrs.is_accessor() => (
                    chain,
                    Target::Setter {
                        holder: Some(holder),
                        slot,
                    },
                ),
                Some((_, _, attrs)) if !attrs.writable() => return None,
                _ if !extensible => return None,
                _ => {
                    let next = shapes.add_property(&shape, key, PropertyAttrs::DEFAULT);
                    let slot = shape.len() as u32;
                    (chain, Target::TransitionAdd { shape: next, slot })
                }
            }
        }
    };
    Some(Resolution {
        guard: Guard::Shape {
            access: Access::Set,
            shape,
            key: key_guard.map(Into::into),
            chain: chain.into_boxed_slice(),
        },
        target,
    })
}

/// Resolve a call or construct of `callee`. Only engine functions are
/// cached; host callables stay generic.
pub fn resolve_call(callee: &ObjectRef, access: Access) -> Option<Resolution> {
    let body = callee.borrow();
    let target = match &body.kind {
        ObjectKind::Function(FunctionKind::Script(closure)) => CallTarget::Script(closure.function),
        ObjectKind::Function(FunctionKind::Native(native)) => CallTarget::Native(native.name),
        _ => return None,
    };
    Some(Resolution {
        guard: Guard::Callee { access, id: body.id() },
        target: Target::Callee(target),
    })
}

/// Site caching policy.
pub struct Linker<'a> {
    pub fanout: usize,
    pub relink_window: u64,
    pub unit: u64,
    pub hook: Option<&'a DiagnosticsHook>,
}

impl Linker<'_> {
    /// Install a resolved entry, escalating the site as needed.
    pub fn install(&self, site: &mut DispatchSite, resolution: Resolution) {
        site.stats.resolutions += 1;
        let from = site.state;
        let entry = SiteEntry {
            guard: resolution.guard,
            target: resolution.target,
            last_hit: site.executions,
        };
        let to = match from {
            SiteState::Megamorphic => return,
            SiteState::Unlinked => {
                site.entries.push(entry);
                SiteState::Monomorphic
            }
            SiteState::Monomorphic => {
                let idle = site
                    .entries
                    .first()
                    .map_or(u64::MAX, |e| site.executions.saturating_sub(e.last_hit));
                if idle > self.relink_window {
                    site.entries.clear();
                    site.entries.push(entry);
                    SiteState::Monomorphic
                } else if self.fanout > 1 {
                    site.entries.insert(0, entry);
                    SiteState::Polymorphic
                } else {
                    self.go_megamorphic(site)
                }
            }
            SiteState::Polymorphic => {
                if site.entries.len() < self.fanout {
                    site.entries.insert(0, entry);
                    SiteState::Polymorphic
                } else {
                    self.go_megamorphic(site)
                }
            }
        };
        site.state = to;
        self.report(site, from, to);
    }

    fn go_megamorphic(&self, site: &mut DispatchSite) -> SiteState {
        site.entries.clear();
        site.entries.shrink_to_fit();
        SiteState::Megamorphic
    }

    fn report(&self, site: &DispatchSite, from: SiteState, to: SiteState) {
        log::debug!(
            "unit{} {} ({}, line {}): {} -> {} [{} entries]",
            self.unit,
            site.id,
            site.kind,
            site.line,
            from,
            to,
            site.entries.len()
        );
        if let Some(hook) = self.hook {
            hook(&SiteTransition {
                unit: self.unit,
                site: site.id,
                site_kind: site.kind.to_string(),
                line: site.line,
                from,
                to,
                entries: site.entries.len(),
            });
        }
    }
}
