//! Shapes: shared, immutable object layouts.
//!
//! A shape lists an object's own named properties in insertion order, each
//! with its slot (the position in the list) and attributes, plus the
//! prototype identity and the extensible flag. Objects whose layouts were
//! built by the same sequence of transitions share one `Arc<Shape>`, so a
//! shape id is enough to guard a cached slot.
//!
//! The [`ShapeTable`] memoizes transitions engine-wide. A published shape
//! is never mutated; every change produces (or finds) another shape.
//! The table holds shapes weakly: a shape lives as long as some object
//! (or a descendant shape) holds it, and dead entries are swept as the
//! table grows.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use super::object::ObjectId;

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a shape, unique across every table in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

impl ShapeId {
    fn next() -> ShapeId {
        ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape{}", self.0)
    }
}

/// Property attribute flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAttrs(u8);

impl PropertyAttrs {
    const WRITABLE: u8 = 1;
    const ENUMERABLE: u8 = 2;
    const CONFIGURABLE: u8 = 4;
    const ACCESSOR: u8 = 8;

    /// Writable, enumerable and configurable: what assignment creates.
    pub const DEFAULT: PropertyAttrs = PropertyAttrs(Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE);

    /// Builtin methods: writable and configurable, not enumerable.
    pub const HIDDEN: PropertyAttrs = PropertyAttrs(Self::WRITABLE | Self::CONFIGURABLE);

    /// Neither writable, enumerable nor configurable.
    pub const FROZEN: PropertyAttrs = PropertyAttrs(0);

    pub const fn data(writable: bool, enumerable: bool, configurable: bool) -> PropertyAttrs {
        let mut bits = 0;
        if writable {
            bits |= Self::WRITABLE;
        }
        if enumerable {
            bits |= Self::ENUMERABLE;
        }
        if configurable {
            bits |= Self::CONFIGURABLE;
        }
        PropertyAttrs(bits)
    }

    pub const fn accessor(enumerable: bool, configurable: bool) -> PropertyAttrs {
        let data = Self::data(false, enumerable, configurable);
        PropertyAttrs(data.0 | Self::ACCESSOR)
    }

    pub fn writable(self) -> bool {
        self.0 & Self::WRITABLE != 0
    }

    pub fn enumerable(self) -> bool {
        self.0 & Self::ENUMERABLE != 0
    }

    pub fn configurable(self) -> bool {
        self.0 & Self::CONFIGURABLE != 0
    }

    pub fn is_accessor(self) -> bool {
        self.0 & Self::ACCESSOR != 0
    }
}

impl Default for PropertyAttrs {
    fn default() -> Self {
        PropertyAttrs::DEFAULT
    }
}

impl fmt::Debug for PropertyAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        if self.is_accessor() {
            write!(f, "a")?;
        } else {
            write!(f, "{}", flag(self.writable(), 'w'))?;
        }
        write!(
            f,
            "{}{}",
            flag(self.enumerable(), 'e'),
            flag(self.configurable(), 'c')
        )
    }
}

/// One named property of a shape. Its slot is its position.
#[derive(Debug, Clone)]
pub struct ShapeProperty {
    pub key: Arc<str>,
    pub attrs: PropertyAttrs,
}

/// Immutable layout shared by objects with the same history.
pub struct Shape {
    id: ShapeId,
    /// Shape this one was derived from. Keeps the transition path alive.
    parent: Option<Arc<Shape>>,
    properties: Vec<ShapeProperty>,
    index: FxHashMap<Arc<str>, u32>,
    proto: Option<ObjectId>,
    extensible: bool,
}

impl Shape {
    fn root(proto: Option<ObjectId>) -> Shape {
        Shape {
            id: ShapeId::next(),
            parent: None,
            properties: Vec::new(),
            index: FxHashMap::default(),
            proto,
            extensible: true,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Slot and attributes of `key`.
    pub fn lookup(&self, key: &str) -> Option<(u32, PropertyAttrs)> {
        let slot = *self.index.get(key)?;
        Some((slot, self.properties[slot as usize].attrs))
    }

    pub fn properties(&self) -> &[ShapeProperty] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn proto(&self) -> Option<ObjectId> {
        self.proto
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    fn derive(self: &Arc<Shape>, key: &TransitionKey) -> Shape {
        let mut properties = self.properties.clone();
        let mut index = self.index.clone();
        let mut proto = self.proto;
        let mut extensible = self.extensible;
        match key {
            TransitionKey::Add(name, attrs) => {
                index.insert(name.clone(), properties.len() as u32);
                properties.push(ShapeProperty {
                    key: name.clone(),
                    attrs: *attrs,
                });
            }
            TransitionKey::Attributes(name, attrs) => {
                if let Some(&slot) = index.get(name) {
                    properties[slot as usize].attrs = *attrs;
                }
            }
            TransitionKey::Prototype(new_proto) => proto = *new_proto,
            TransitionKey::PreventExtensions => extensible = false,
        }
        Shape {
            id: ShapeId::next(),
            parent: Some(Arc::clone(self)),
            properties,
            index,
            proto,
            extensible,
        }
    }
}

impl Drop for Shape {
    // Unlink the parent chain iteratively; long chains would otherwise
    // recurse once per property.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(shape) = parent {
            parent = match Arc::try_unwrap(shape) {
                Ok(mut shape) => shape.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.id)?;
        for (i, prop) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}:{:?}", prop.key, prop.attrs)?;
        }
        write!(f, " }}")?;
        if !self.extensible {
            write!(f, " sealed")?;
        }
        Ok(())
    }
}

/// Edge label of the transition tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransitionKey {
    Add(Arc<str>, PropertyAttrs),
    Attributes(Arc<str>, PropertyAttrs),
    Prototype(Option<ObjectId>),
    PreventExtensions,
}

/// Table size below which dead entries are never swept.
const MIN_SWEEP: usize = 256;

/// Engine-wide shape registry.
pub struct ShapeTable {
    roots: DashMap<Option<ObjectId>, Weak<Shape>, FxBuildHasher>,
    transitions: DashMap<(ShapeId, TransitionKey), Weak<Shape>, FxBuildHasher>,
    /// Entry count (roots plus transitions) that triggers the next sweep.
    sweep_at: AtomicUsize,
}

impl Default for ShapeTable {
    fn default() -> Self {
        ShapeTable {
            roots: DashMap::default(),
            transitions: DashMap::default(),
            sweep_at: AtomicUsize::new(MIN_SWEEP),
        }
    }
}

/// Live shape behind `entry`, or a fresh one stored in its place.
fn upgrade_or_insert<K, S>(entry: Entry<'_, K, Weak<Shape>, S>, make: impl FnOnce() -> Shape) -> (Arc<Shape>, bool)
where
    K: Eq + std::hash::Hash,
    S: std::hash::BuildHasher + Clone,
{
    match entry {
        Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
            Some(shape) => (shape, false),
            None => {
                let shape = Arc::new(make());
                occupied.insert(Arc::downgrade(&shape));
                (shape, true)
            }
        },
        Entry::Vacant(vacant) => {
            let shape = Arc::new(make());
            vacant.insert(Arc::downgrade(&shape));
            (shape, true)
        }
    }
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty, extensible shape for objects whose prototype is `proto`.
    pub fn root(&self, proto: Option<ObjectId>) -> Arc<Shape> {
        if let Some(shape) = self.roots.get(&proto).and_then(|weak| weak.upgrade()) {
            return shape;
        }
        let (shape, created) = upgrade_or_insert(self.roots.entry(proto), || Shape::root(proto));
        if created {
            self.maybe_sweep();
        }
        shape
    }

    /// Follow (or create) the edge `key` out of `from`.
    pub fn transition(&self, from: &Arc<Shape>, key: TransitionKey) -> Arc<Shape> {
        let edge = (from.id, key);
        if let Some(shape) = self.transitions.get(&edge).and_then(|weak| weak.upgrade()) {
            return shape;
        }
        let key = edge.1.clone();
        let (shape, created) = upgrade_or_insert(self.transitions.entry(edge), || from.derive(&key));
        if created {
            log::trace!("shape transition {} --{:?}--> {}", from.id, key, shape.id);
            self.maybe_sweep();
        }
        shape
    }

    pub fn add_property(&self, from: &Arc<Shape>, key: &str, attrs: PropertyAttrs) -> Arc<Shape> {
        self.transition(from, TransitionKey::Add(Arc::from(key), attrs))
    }

    pub fn change_attributes(&self, from: &Arc<Shape>, key: &str, attrs: PropertyAttrs) -> Arc<Shape> {
        self.transition(from, TransitionKey::Attributes(Arc::from(key), attrs))
    }

    pub fn set_prototype(&self, from: &Arc<Shape>, proto: Option<ObjectId>) -> Arc<Shape> {
        self.transition(from, TransitionKey::Prototype(proto))
    }

    pub fn prevent_extensions(&self, from: &Arc<Shape>) -> Arc<Shape> {
        self.transition(from, TransitionKey::PreventExtensions)
    }

    /// Shape without `key`, rebuilt by replaying the remaining additions
    /// from the root. Slots of the remaining properties keep their order.
    pub fn remove_property(&self, from: &Arc<Shape>, key: &str) -> Arc<Shape> {
        let mut shape = self.root(from.proto);
        for prop in from.properties.iter().filter(|p| &*p.key != key) {
            shape = self.transition(&shape, TransitionKey::Add(prop.key.clone(), prop.attrs));
        }
        if !from.extensible {
            shape = self.prevent_extensions(&shape);
        }
        shape
    }

    /// Number of memoized transitions whose target shape is still alive.
    pub fn transition_count(&self) -> usize {
        self.transitions.iter().filter(|entry| entry.value().strong_count() > 0).count()
    }

    /// Number of prototype roots whose shape is still alive.
    pub fn root_count(&self) -> usize {
        self.roots.iter().filter(|entry| entry.value().strong_count() > 0).count()
    }

    fn entry_count(&self) -> usize {
        self.roots.len() + self.transitions.len()
    }

    /// Drop entries whose shape has died once the table has doubled since
    /// the last sweep.
    fn maybe_sweep(&self) {
        let threshold = self.sweep_at.load(Ordering::Relaxed);
        if self.entry_count() < threshold {
            return;
        }
        if self
            .sweep_at
            .compare_exchange(threshold, usize::MAX, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.sweep();
    }

    /// Remove every entry whose shape has died.
    pub fn sweep(&self) {
        let before = self.entry_count();
        self.roots.retain(|_, weak| weak.strong_count() > 0);
        self.transitions.retain(|_, weak| weak.strong_count() > 0);
        let after = self.entry_count();
        self.sweep_at.store((after * 2).max(MIN_SWEEP), Ordering::Release);
        log::trace!("shape table swept, {} -> {} entries", before, after);
    }
}

impl fmt::Debug for ShapeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTable")
            .field("roots", &self.roots.len())
            .field("transitions", &self.transitions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_history_shares_shape() {
        let table = ShapeTable::new();
        let root = table.root(None);
        let a1 = table.add_property(&root, "a", PropertyAttrs::DEFAULT);
        let b1 = table.add_property(&a1, "b", PropertyAttrs::DEFAULT);
        let a2 = table.add_property(&table.root(None), "a", PropertyAttrs::DEFAULT);
        let b2 = table.add_property(&a2, "b", PropertyAttrs::DEFAULT);
        assert!(Arc::ptr_eq(&b1, &b2));
        assert_eq!(b1.lookup("b").map(|(slot, _)| slot), Some(1));
    }

    #[test]
    fn test_different_order_different_shape() {
        let table = ShapeTable::new();
        let root = table.root(None);
        let ab = table.add_property(&table.add_property(&root, "a", PropertyAttrs::DEFAULT), "b", PropertyAttrs::DEFAULT);
        let ba = table.add_property(&table.add_property(&root, "b", PropertyAttrs::DEFAULT), "a", PropertyAttrs::DEFAULT);
        assert_ne!(ab.id(), ba.id());
    }

    #[test]
    fn test_transitions_never_mutate() {
        let table = ShapeTable::new();
        let root = table.root(None);
        let a = table.add_property(&root, "a", PropertyAttrs::DEFAULT);
        let frozen = table.change_attributes(&a, "a", PropertyAttrs::FROZEN);
        assert!(a.lookup("a").is_some_and(|(_, attrs)| attrs.writable()));
        assert!(frozen.lookup("a").is_some_and(|(_, attrs)| !attrs.writable()));
        assert!(root.is_empty());
    }

    #[test]
    fn test_remove_property_replays() {
        let table = ShapeTable::new();
        let root = table.root(None);
        let a = table.add_property(&root, "a", PropertyAttrs::DEFAULT);
        let ab = table.add_property(&a, "b", PropertyAttrs::DEFAULT);
        let abc = table.add_property(&ab, "c", PropertyAttrs::DEFAULT);
        let without_b = table.remove_property(&abc, "b");
        let ac = table.add_property(&a, "c", PropertyAttrs::DEFAULT);
        assert!(Arc::ptr_eq(&without_b, &ac));
        assert_eq!(without_b.lookup("c").map(|(slot, _)| slot), Some(1));
    }

    #[test]
    fn test_prototype_and_extensibility_are_part_of_shape() {
        let table = ShapeTable::new();
        let root = table.root(None);
        let other = table.set_prototype(&root, Some(ObjectId(42)));
        assert_eq!(other.proto(), Some(ObjectId(42)));
        assert_ne!(other.id(), root.id());
        let sealed = table.prevent_extensions(&root);
        assert!(!sealed.is_extensible());
        assert!(root.is_extensible());
    }

    #[test]
    fn test_table_is_shared_across_threads() {
        let table = Arc::new(ShapeTable::new());
        let shapes: Vec<Arc<Shape>> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    let root = table.root(None);
                    table.add_property(&root, "x", PropertyAttrs::DEFAULT)
                })
            })
            .map(|handle| handle.join().unwrap())
            .collect();
        assert!(shapes.windows(2).all(|w| w[0].id() == w[1].id()));
    }

    #[test]
    fn test_dead_shapes_leave_the_table() {
        let table = ShapeTable::new();
        let kept = table.add_property(&table.root(Some(ObjectId(1))), "x", PropertyAttrs::DEFAULT);
        for proto in 2..2000 {
            let root = table.root(Some(ObjectId(proto)));
            table.add_property(&root, "x", PropertyAttrs::DEFAULT);
        }
        assert_eq!(table.transition_count(), 1);
        assert_eq!(table.root_count(), 1);
        table.sweep();
        assert!(table.transitions.len() <= 1 && table.roots.len() <= 1);
        let again = table.add_property(&table.root(Some(ObjectId(1))), "x", PropertyAttrs::DEFAULT);
        assert!(Arc::ptr_eq(&kept, &again));
    }

    #[test]
    fn test_entries_are_swept_while_growing() {
        let table = ShapeTable::new();
        for proto in 0..10_000 {
            table.add_property(&table.root(Some(ObjectId(proto))), "x", PropertyAttrs::DEFAULT);
        }
        assert!(table.transitions.len() < 4 * MIN_SWEEP);
    }

    #[test]
    fn test_long_chain_drops() {
        let table = ShapeTable::new();
        let mut shape = table.root(None);
        for i in 0..5_000 {
            shape = table.add_property(&shape, &format!("k{}", i), PropertyAttrs::DEFAULT);
        }
        assert_eq!(shape.len(), 5_000);
        drop(shape);
        assert_eq!(table.transition_count(), 0);
    }

    #[test]
    fn test_attrs_debug() {
        assert_eq!(format!("{:?}", PropertyAttrs::DEFAULT), "wec");
        assert_eq!(format!("{:?}", PropertyAttrs::HIDDEN), "w-c");
        assert_eq!(format!("{:?}", PropertyAttrs::accessor(true, false)), "ae-");
    }
}
