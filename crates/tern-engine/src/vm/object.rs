//! Runtime objects.
//!
//! An object is a shared [`Shape`] plus an owned slot vector, a prototype
//! link and a kind. Named properties live in the slots at the positions
//! the shape assigns; array elements and the virtual `length` of arrays
//! and string wrappers live outside the shape.
//!
//! Everything here is pure object-model work: nothing in this module runs
//! script code. Getters, setters and host capabilities are invoked by the
//! interpreter.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::convert::{array_index, code_unit_at, same_value, to_uint32, utf16_len};
use super::error::VmResult;
use super::host::HostObject;
use super::interpreter::Interpreter;
use super::shape::{PropertyAttrs, Shape, ShapeId, ShapeTable};
use super::unit::UnitCode;
use super::value::Value;
use crate::compiler::ir::FunctionId;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Tracked-object count below which the heap never sweeps.
const MIN_HEAP_SWEEP: usize = 1024;

/// Largest gap an array write may open before elements go sparse.
pub const DENSE_GAP: usize = 1024;

/// Identity of an object, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    fn next() -> ObjectId {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A captured variable shared between a frame and its closures.
pub type Cell = Rc<RefCell<Value>>;

/// Object-model failures. The interpreter reports them as `TypeError`s,
/// except `InvalidArrayLength`, which is a `RangeError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("Cyclic __proto__ value")]
    PrototypeCycle,

    #[error("Object is not extensible")]
    NotExtensible,

    #[error("Cannot redefine property: {0}")]
    NotConfigurable(String),

    #[error("Cannot assign to read only property '{0}'")]
    ReadOnly(String),

    #[error("Invalid array length")]
    InvalidArrayLength,

    #[error("Accessor properties are not supported on array element {0}")]
    AccessorElement(String),
}

/// Contents of one slot.
#[derive(Debug, Clone)]
pub enum Slot {
    Data(Value),
    Accessor {
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
    },
}

/// An own property as seen by a lookup.
#[derive(Debug, Clone)]
pub enum OwnProperty {
    Data {
        value: Value,
        attrs: PropertyAttrs,
    },
    Accessor {
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        attrs: PropertyAttrs,
    },
}

impl OwnProperty {
    pub fn attrs(&self) -> PropertyAttrs {
        match self {
            OwnProperty::Data { attrs, .. } | OwnProperty::Accessor { attrs, .. } => *attrs,
        }
    }
}

/// Partial property description, as passed to `Object.defineProperty`.
/// `get`/`set` hold `Some(None)` for an explicit `undefined`.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub get: Option<Option<ObjectRef>>,
    pub set: Option<Option<ObjectRef>>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// A complete data descriptor.
    pub fn data(value: Value, attrs: PropertyAttrs) -> Self {
        Self {
            value: Some(value),
            writable: Some(attrs.writable()),
            get: None,
            set: None,
            enumerable: Some(attrs.enumerable()),
            configurable: Some(attrs.configurable()),
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }
}

/// A script function instance.
#[derive(Clone)]
pub struct Closure {
    pub unit: Rc<UnitCode>,
    pub function: FunctionId,
    pub upvalues: Rc<[Cell]>,
    /// `with` objects in scope where the closure was created
    pub with_stack: Rc<[ObjectRef]>,
}

/// Signature of builtin functions: interpreter, `this`, arguments, and
/// whether the call is a `new`.
pub type NativeFn = fn(&mut Interpreter<'_>, &Value, &[Value], bool) -> VmResult<Value>;

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub call: NativeFn,
    pub constructible: bool,
}

#[derive(Clone)]
pub enum FunctionKind {
    Script(Closure),
    Native(NativeFunction),
}

/// Dense array storage. `None` marks a hole: an index below `length`
/// with no own property. Elements past a large gap become named
/// properties and the array is marked sparse.
#[derive(Debug, Clone, Default)]
pub struct ArrayStorage {
    pub elements: Vec<Option<Value>>,
    pub length: u32,
    pub sparse: bool,
}

impl ArrayStorage {
    pub fn from_elements(elements: Vec<Value>) -> Self {
        Self::with_holes(elements.into_iter().map(Some).collect())
    }

    /// Storage for an array literal, where elisions are holes.
    pub fn with_holes(elements: Vec<Option<Value>>) -> Self {
        let length = elements.len() as u32;
        Self {
            elements,
            length,
            sparse: false,
        }
    }

    /// Element at `index`, `None` for holes and indices past the dense part.
    pub fn element(&self, index: u32) -> Option<&Value> {
        self.elements.get(index as usize)?.as_ref()
    }
}

pub enum ObjectKind {
    Ordinary,
    Array(ArrayStorage),
    Function(FunctionKind),
    Error,
    Arguments,
    /// `Object(primitive)` wrapper
    Primitive(Value),
    RegExp {
        source: Rc<str>,
        flags: Rc<str>,
    },
    /// `for-in` key snapshot
    KeyIterator {
        keys: Vec<Rc<str>>,
        next: usize,
        object: Option<ObjectRef>,
    },
    Host(Rc<dyn HostObject>),
}

/// Object body. Reached through [`ObjectRef`].
pub struct JsObject {
    id: ObjectId,
    shape: Arc<Shape>,
    slots: Vec<Slot>,
    proto: Option<ObjectRef>,
    pub kind: ObjectKind,
}

/// The value a string or number becomes when used as an array length.
pub fn array_length_value(value: &Value) -> Result<u32, ObjectError> {
    let number = value.as_number().ok_or(ObjectError::InvalidArrayLength)?;
    let length = to_uint32(number);
    if length as f64 == number {
        Ok(length)
    } else {
        Err(ObjectError::InvalidArrayLength)
    }
}

impl JsObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn proto(&self) -> Option<&ObjectRef> {
        self.proto.as_ref()
    }

    pub fn is_extensible(&self) -> bool {
        self.shape.is_extensible()
    }

    pub fn slot(&self, slot: u32) -> Option<&Slot> {
        self.slots.get(slot as usize)
    }

    pub fn array(&self) -> Option<&ArrayStorage> {
        match &self.kind {
            ObjectKind::Array(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn array_mut(&mut self) -> Option<&mut ArrayStorage> {
        match &mut self.kind {
            ObjectKind::Array(storage) => Some(storage),
            _ => None,
        }
    }

    /// Keys whose storage is not described by the shape. Dispatch sites
    /// never cache these.
    pub fn is_exotic_key(&self, key: &str) -> bool {
        match &self.kind {
            ObjectKind::Array(_) | ObjectKind::Primitive(Value::String(_)) => {
                key == "length" || array_index(key).is_some()
            }
            ObjectKind::Host(_) => true,
            _ => false,
        }
    }

    pub fn get_own(&self, key: &str) -> Option<OwnProperty> {
        match &self.kind {
            ObjectKind::Array(storage) => {
                if key == "length" {
                    return Some(OwnProperty::Data {
                        value: Value::number(storage.length as f64),
                        attrs: PropertyAttrs::data(true, false, false),
                    });
                }
                if let Some(value) = array_index(key).and_then(|i| storage.element(i)) {
                    return Some(OwnProperty::Data {
                        value: value.clone(),
                        attrs: PropertyAttrs::DEFAULT,
                    });
                }
            }
            ObjectKind::Primitive(Value::String(text)) => {
                if key == "length" {
                    return Some(OwnProperty::Data {
                        value: Value::number(utf16_len(text) as f64),
                        attrs: PropertyAttrs::FROZEN,
                    });
                }
                if let Some(unit) = array_index(key).and_then(|i| code_unit_at(text, i as usize)) {
                    return Some(OwnProperty::Data {
                        value: Value::from(unit),
                        attrs: PropertyAttrs::data(false, true, false),
                    });
                }
            }
            _ => {}
        }
        let (slot, attrs) = self.shape.lookup(key)?;
        Some(match &self.slots[slot as usize] {
            Slot::Data(value) => OwnProperty::Data {
                value: value.clone(),
                attrs,
            },
            Slot::Accessor { getter, setter } => OwnProperty::Accessor {
                getter: getter.clone(),
                setter: setter.clone(),
                attrs,
            },
        })
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.get_own(key).is_some()
    }

    /// Own keys, array indices first in ascending order, then the other
    /// keys in insertion order.
    pub fn own_keys(&self, only_enumerable: bool) -> Vec<Rc<str>> {
        let mut indices: Vec<u32> = Vec::new();
        let mut named: Vec<Rc<str>> = Vec::new();
        let mut virtual_length = false;
        match &self.kind {
            ObjectKind::Array(storage) => {
                indices.extend(
                    storage
                        .elements
                        .iter()
                        .enumerate()
                        .filter(|(_, element)| element.is_some())
                        .map(|(i, _)| i as u32),
                );
                virtual_length = true;
            }
            ObjectKind::Primitive(Value::String(text)) => {
                indices.extend(0..utf16_len(text) as u32);
                virtual_length = true;
            }
            _ => {}
        }
        for prop in self.shape.properties() {
            if only_enumerable && !prop.attrs.enumerable() {
                continue;
            }
            match array_index(&prop.key) {
                Some(index) => indices.push(index),
                None => named.push(Rc::from(&*prop.key)),
            }
        }
        indices.sort_unstable();
        indices.dedup();
        let mut keys: Vec<Rc<str>> = indices.into_iter().map(|i| Rc::from(i.to_string())).collect();
        if virtual_length && !only_enumerable {
            keys.push(Rc::from("length"));
        }
        keys.extend(named);
        keys
    }

    fn add_named(&mut self, shapes: &ShapeTable, key: &str, slot: Slot, attrs: PropertyAttrs) {
        self.shape = shapes.add_property(&self.shape, key, attrs);
        self.slots.push(slot);
    }

    /// Overwrite an existing own data property. Writability is checked by
    /// the caller.
    pub fn write_own(&mut self, shapes: &ShapeTable, key: &str, value: Value) -> Result<(), ObjectError> {
        if let Some(storage) = self.array_mut() {
            if key == "length" {
                let length = array_length_value(&value)?;
                return self.set_array_length(shapes, length);
            }
            if let Some(index) = array_index(key) {
                if let Some(Some(element)) = storage.elements.get_mut(index as usize) {
                    *element = value;
                    return Ok(());
                }
            }
        }
        match self.shape.lookup(key) {
            Some((slot, attrs)) if !attrs.is_accessor() => {
                self.slots[slot as usize] = Slot::Data(value);
                Ok(())
            }
            _ => Err(ObjectError::ReadOnly(key.to_string())),
        }
    }

    /// Write a slot the caller has already resolved.
    pub fn write_slot(&mut self, slot: u32, value: Value) {
        if let Some(target) = self.slots.get_mut(slot as usize) {
            *target = Slot::Data(value);
        }
    }

    /// Apply a cached add-property transition: `shape` must be the
    /// successor of the current shape and `slot` the next free slot.
    pub fn apply_transition(&mut self, shape: Arc<Shape>, slot: u32, value: Value) -> bool {
        if slot as usize != self.slots.len() || shape.len() != self.slots.len() + 1 {
            return false;
        }
        self.shape = shape;
        self.slots.push(Slot::Data(value));
        true
    }

    /// Create an own data property with `attrs`.
    pub fn add_own(&mut self, shapes: &ShapeTable, key: &str, value: Value, attrs: PropertyAttrs) -> Result<(), ObjectError> {
        if !self.is_extensible() {
            return Err(ObjectError::NotExtensible);
        }
        if let (Some(index), Some(storage)) = (array_index(key), self.array_mut()) {
            let i = index as usize;
            let len = storage.elements.len();
            storage.length = storage.length.max(index + 1);
            if i < len {
                storage.elements[i] = Some(value);
                return Ok(());
            }
            if !storage.sparse && i <= len + DENSE_GAP {
                storage.elements.resize(i, None);
                storage.elements.push(Some(value));
                return Ok(());
            }
            storage.sparse = true;
        }
        self.add_named(shapes, key, Slot::Data(value), attrs);
        Ok(())
    }

    /// Install or replace a property without validation. Used while
    /// building intrinsics.
    pub fn define_raw(&mut self, shapes: &ShapeTable, key: &str, slot: Slot, attrs: PropertyAttrs) {
        match self.shape.lookup(key) {
            Some((index, old)) => {
                if old != attrs {
                    self.shape = shapes.change_attributes(&self.shape, key, attrs);
                }
                self.slots[index as usize] = slot;
            }
            None => self.add_named(shapes, key, slot, attrs),
        }
    }

    /// `[[DefineOwnProperty]]` with throwing semantics.
    pub fn define_own_property(
        &mut self,
        shapes: &ShapeTable,
        key: &str,
        desc: PropertyDescriptor,
    ) -> Result<(), ObjectError> {
        match &self.kind {
            ObjectKind::Array(storage) => {
                if key == "length" {
                    if desc.is_accessor() {
                        return Err(ObjectError::NotConfigurable(key.to_string()));
                    }
                    if let Some(value) = &desc.value {
                        let length = array_length_value(value)?;
                        self.set_array_length(shapes, length)?;
                    }
                    return Ok(());
                }
                if let Some(index) = array_index(key) {
                    let in_dense = (index as usize) < storage.elements.len();
                    if in_dense || !storage.sparse {
                        if desc.is_accessor() {
                            return Err(ObjectError::AccessorElement(key.to_string()));
                        }
                        let existing = storage.element(index).cloned();
                        if existing.is_none() && !self.is_extensible() {
                            return Err(ObjectError::NotExtensible);
                        }
                        let value = desc.value.or(existing).unwrap_or_default();
                        if !in_dense {
                            return self.add_own(shapes, key, value, PropertyAttrs::DEFAULT);
                        }
                        if let Some(storage) = self.array_mut() {
                            storage.elements[index as usize] = Some(value);
                        }
                        return Ok(());
                    }
                }
            }
            ObjectKind::Primitive(Value::String(_)) if self.is_exotic_key(key) => {
                return Err(ObjectError::NotConfigurable(key.to_string()));
            }
            _ => {}
        }

        let Some((slot, attrs)) = self.shape.lookup(key) else {
            if !self.is_extensible() {
                return Err(ObjectError::NotExtensible);
            }
            let (slot, attrs) = if desc.is_accessor() {
                (
                    Slot::Accessor {
                        getter: desc.get.flatten(),
                        setter: desc.set.flatten(),
                    },
                    PropertyAttrs::accessor(desc.enumerable.unwrap_or(false), desc.configurable.unwrap_or(false)),
                )
            } else {
                (
                    Slot::Data(desc.value.unwrap_or_default()),
                    PropertyAttrs::data(
                        desc.writable.unwrap_or(false),
                        desc.enumerable.unwrap_or(false),
                        desc.configurable.unwrap_or(false),
                    ),
                )
            };
            self.add_named(shapes, key, slot, attrs);
            return Ok(());
        };

        let current = self.slots[slot as usize].clone();
        if !attrs.configurable() {
            let reject = || Err(ObjectError::NotConfigurable(key.to_string()));
            if desc.configurable == Some(true) {
                return reject();
            }
            if desc.enumerable.is_some_and(|e| e != attrs.enumerable()) {
                return reject();
            }
            match &current {
                Slot::Data(value) => {
                    if desc.is_accessor() {
                        return reject();
                    }
                    if !attrs.writable() {
                        if desc.writable == Some(true) {
                            return reject();
                        }
                        if desc.value.as_ref().is_some_and(|v| !same_value(v, value)) {
                            return reject();
                        }
                    }
                }
                Slot::Accessor { getter, setter } => {
                    if desc.is_data() {
                        return reject();
                    }
                    let differs = |new: &Option<Option<ObjectRef>>, old: &Option<ObjectRef>| match new {
                        Some(new) => !same_function(new, old),
                        None => false,
                    };
                    if differs(&desc.get, getter) || differs(&desc.set, setter) {
                        return reject();
                    }
                }
            }
        }

        let enumerable = desc.enumerable.unwrap_or(attrs.enumerable());
        let configurable = desc.configurable.unwrap_or(attrs.configurable());
        let (new_slot, new_attrs) = match current {
            Slot::Accessor { getter, setter } if !desc.is_data() => (
                Slot::Accessor {
                    getter: desc.get.unwrap_or(getter),
                    setter: desc.set.unwrap_or(setter),
                },
                PropertyAttrs::accessor(enumerable, configurable),
            ),
            Slot::Data(_) if desc.is_accessor() => (
                Slot::Accessor {
                    getter: desc.get.flatten(),
                    setter: desc.set.flatten(),
                },
                PropertyAttrs::accessor(enumerable, configurable),
            ),
            Slot::Accessor { .. } => (
                Slot::Data(desc.value.unwrap_or_default()),
                PropertyAttrs::data(desc.writable.unwrap_or(false), enumerable, configurable),
            ),
            Slot::Data(value) => (
                Slot::Data(desc.value.unwrap_or(value)),
                PropertyAttrs::data(desc.writable.unwrap_or(attrs.writable()), enumerable, configurable),
            ),
        };
        if new_attrs != attrs {
            self.shape = shapes.change_attributes(&self.shape, key, new_attrs);
        }
        self.slots[slot as usize] = new_slot;
        Ok(())
    }

    /// Remove a named property. False when it is not configurable.
    fn remove_named(&mut self, shapes: &ShapeTable, key: &str) -> bool {
        let Some((slot, attrs)) = self.shape.lookup(key) else {
            return true;
        };
        if !attrs.configurable() {
            return false;
        }
        self.shape = shapes.remove_property(&self.shape, key);
        self.slots.remove(slot as usize);
        true
    }

    /// `[[Delete]]`. False when the property exists and is not
    /// configurable.
    pub fn delete_own(&mut self, shapes: &ShapeTable, key: &str) -> bool {
        if matches!(self.kind, ObjectKind::Primitive(Value::String(_))) && self.is_exotic_key(key) && self.has_own(key) {
            return false;
        }
        if let Some(storage) = self.array_mut() {
            if key == "length" {
                return false;
            }
            if let Some(index) = array_index(key) {
                let i = index as usize;
                if i < storage.elements.len() {
                    storage.elements[i] = None;
                    while let Some(None) = storage.elements.last() {
                        storage.elements.pop();
                    }
                    return true;
                }
            }
        }
        self.remove_named(shapes, key)
    }

    pub fn set_array_length(&mut self, shapes: &ShapeTable, length: u32) -> Result<(), ObjectError> {
        let Some(storage) = self.array_mut() else {
            return Ok(());
        };
        if (length as usize) < storage.elements.len() {
            storage.elements.truncate(length as usize);
        }
        let sparse = storage.sparse;
        storage.length = length;
        if sparse {
            let doomed: Vec<Arc<str>> = self
                .shape
                .properties()
                .iter()
                .filter(|p| array_index(&p.key).is_some_and(|i| i >= length))
                .map(|p| p.key.clone())
                .collect();
            for key in doomed {
                self.remove_named(shapes, &key);
            }
        }
        Ok(())
    }

    pub fn prevent_extensions(&mut self, shapes: &ShapeTable) {
        if self.is_extensible() {
            self.shape = shapes.prevent_extensions(&self.shape);
        }
    }
}

fn same_function(a: &Option<ObjectRef>, b: &Option<ObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

struct Tracked {
    objects: Vec<Weak<RefCell<JsObject>>>,
    sweep_at: usize,
}

/// Every object a realm allocates, held weakly.
///
/// Script objects point at each other through `Rc`, so a function and its
/// `prototype` (or any user-built cycle) would outlive the realm. Dropping
/// the heap empties every object still alive, which breaks those cycles
/// and releases their shapes. Derefs to the engine's shape table.
pub struct Heap {
    shapes: Arc<ShapeTable>,
    tracked: RefCell<Tracked>,
}

impl Heap {
    pub fn new(shapes: Arc<ShapeTable>) -> Heap {
        Heap {
            shapes,
            tracked: RefCell::new(Tracked {
                objects: Vec::new(),
                sweep_at: MIN_HEAP_SWEEP,
            }),
        }
    }

    pub fn shape_table(&self) -> &Arc<ShapeTable> {
        &self.shapes
    }

    /// Objects allocated here that are still reachable from somewhere.
    pub fn live_objects(&self) -> usize {
        self.tracked.borrow().objects.iter().filter(|o| o.strong_count() > 0).count()
    }

    fn track(&self, object: &Rc<RefCell<JsObject>>) {
        let mut tracked = self.tracked.borrow_mut();
        if tracked.objects.len() >= tracked.sweep_at {
            tracked.objects.retain(|o| o.strong_count() > 0);
            tracked.sweep_at = (tracked.objects.len() * 2).max(MIN_HEAP_SWEEP);
        }
        tracked.objects.push(Rc::downgrade(object));
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new(Arc::new(ShapeTable::new()))
    }
}

impl Deref for Heap {
    type Target = ShapeTable;

    fn deref(&self) -> &ShapeTable {
        &self.shapes
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let objects = std::mem::take(&mut self.tracked.get_mut().objects);
        let empty = self.shapes.root(None);
        let mut cleared = 0usize;
        for object in objects.iter().filter_map(Weak::upgrade) {
            let Ok(mut body) = object.try_borrow_mut() else {
                continue;
            };
            let slots = std::mem::take(&mut body.slots);
            let proto = body.proto.take();
            let kind = std::mem::replace(&mut body.kind, ObjectKind::Ordinary);
            body.shape = empty.clone();
            drop(body);
            drop((slots, proto, kind));
            cleared += 1;
        }
        log::debug!("heap dropped, {} objects emptied", cleared);
    }
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<JsObject>>);

impl ObjectRef {
    pub fn new(heap: &Heap, proto: Option<ObjectRef>, kind: ObjectKind) -> ObjectRef {
        let shape = heap.root(proto.as_ref().map(|p| p.id()));
        let object = Rc::new(RefCell::new(JsObject {
            id: ObjectId::next(),
            shape,
            slots: Vec::new(),
            proto,
            kind,
        }));
        heap.track(&object);
        ObjectRef(object)
    }

    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> ObjectId {
        self.0.borrow().id
    }

    pub fn shape_id(&self) -> ShapeId {
        self.0.borrow().shape.id()
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.0.borrow().proto.clone()
    }

    /// Class tag used by `Object.prototype.toString`.
    pub fn class_name(&self) -> &'static str {
        let Ok(object) = self.0.try_borrow() else {
            return "Object";
        };
        match &object.kind {
            ObjectKind::Ordinary | ObjectKind::Host(_) => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Primitive(Value::String(_)) => "String",
            ObjectKind::Primitive(Value::Boolean(_)) => "Boolean",
            ObjectKind::Primitive(_) => "Number",
            ObjectKind::RegExp { .. } => "RegExp",
            ObjectKind::KeyIterator { .. } => "Iterator",
        }
    }

    pub fn is_callable(&self) -> bool {
        match &self.0.borrow().kind {
            ObjectKind::Function(_) => true,
            ObjectKind::Host(host) => host.is_callable(),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }

    pub fn host(&self) -> Option<Rc<dyn HostObject>> {
        match &self.0.borrow().kind {
            ObjectKind::Host(host) => Some(host.clone()),
            _ => None,
        }
    }

    /// Data property lookup along the prototype chain that never runs
    /// code: accessors and host objects end the search.
    pub fn get_data(&self, key: &str) -> Option<Value> {
        let mut cursor = Some(self.clone());
        while let Some(object) = cursor {
            let body = object.borrow();
            if let ObjectKind::Host(_) = body.kind {
                return None;
            }
            match body.get_own(key) {
                Some(OwnProperty::Data { value, .. }) => return Some(value),
                Some(OwnProperty::Accessor { .. }) => return None,
                None => {}
            }
            cursor = body.proto.clone();
        }
        None
    }

    /// Replace the prototype. Rejects cycles and non-extensible objects
    /// and leaves the object untouched when it does.
    pub fn set_prototype(&self, shapes: &ShapeTable, proto: Option<ObjectRef>) -> Result<(), ObjectError> {
        let same = match (&self.borrow().proto, &proto) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        if same {
            return Ok(());
        }
        if !self.borrow().is_extensible() {
            return Err(ObjectError::NotExtensible);
        }
        let mut cursor = proto.clone();
        while let Some(object) = cursor {
            if object.ptr_eq(self) {
                return Err(ObjectError::PrototypeCycle);
            }
            cursor = object.proto();
        }
        let proto_id = proto.as_ref().map(|p| p.id());
        let mut body = self.borrow_mut();
        body.shape = shapes.set_prototype(&body.shape, proto_id);
        body.proto = proto;
        Ok(())
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "[object {} #{}]", self.class_name(), object.id.0),
            Err(_) => write!(f, "[object <borrowed>]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(shapes: &Heap) -> ObjectRef {
        ObjectRef::new(shapes, None, ObjectKind::Ordinary)
    }

    #[test]
    fn test_dropping_heap_breaks_cycles() {
        let table = Arc::new(ShapeTable::new());
        let (object, heap_count) = {
            let heap = Heap::new(Arc::clone(&table));
            let a = plain(&heap);
            let b = ObjectRef::new(&heap, Some(a.clone()), ObjectKind::Ordinary);
            a.borrow_mut()
                .add_own(&heap, "child", Value::Object(b), PropertyAttrs::DEFAULT)
                .unwrap();
            (Rc::downgrade(&a.0), heap.live_objects())
        };
        assert_eq!(heap_count, 2);
        assert!(object.upgrade().is_none());
        assert_eq!(table.transition_count(), 0);
    }

    #[test]
    fn test_heap_sweeps_dead_objects() {
        let heap = Heap::default();
        let kept = plain(&heap);
        for _ in 0..5 * MIN_HEAP_SWEEP {
            plain(&heap);
        }
        assert_eq!(heap.live_objects(), 1);
        assert!(heap.tracked.borrow().objects.len() <= 2 * MIN_HEAP_SWEEP);
        drop(kept);
    }

    #[test]
    fn test_same_additions_share_shape() {
        let shapes = Heap::default();
        let a = plain(&shapes);
        let b = plain(&shapes);
        for object in [&a, &b] {
            let mut body = object.borrow_mut();
            body.add_own(&shapes, "a", Value::Int(1), PropertyAttrs::DEFAULT).unwrap();
            body.add_own(&shapes, "b", Value::Int(2), PropertyAttrs::DEFAULT).unwrap();
        }
        assert_eq!(a.shape_id(), b.shape_id());
    }

    #[test]
    fn test_delete_compacts_slots() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
            body.add_own(&shapes, key, Value::Int(value), PropertyAttrs::DEFAULT).unwrap();
        }
        assert!(body.delete_own(&shapes, "b"));
        assert!(!body.has_own("b"));
        assert!(matches!(body.get_own("c"), Some(OwnProperty::Data { value: Value::Int(3), .. })));
        assert_eq!(body.own_keys(true), vec![Rc::from("a"), Rc::from("c")]);
    }

    #[test]
    fn test_non_configurable_survives_delete() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        body.add_own(&shapes, "x", Value::Int(1), PropertyAttrs::FROZEN).unwrap();
        assert!(!body.delete_own(&shapes, "x"));
        assert!(body.has_own("x"));
    }

    #[test]
    fn test_keys_put_indices_first() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        for key in ["b", "2", "a", "0"] {
            body.add_own(&shapes, key, Value::Null, PropertyAttrs::DEFAULT).unwrap();
        }
        let keys: Vec<String> = body.own_keys(true).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "b", "a"]);
    }

    #[test]
    fn test_prototype_cycle_is_rejected_atomically() {
        let shapes = Heap::default();
        let a = plain(&shapes);
        let b = ObjectRef::new(&shapes, Some(a.clone()), ObjectKind::Ordinary);
        let before = a.shape_id();
        assert_eq!(a.set_prototype(&shapes, Some(b.clone())), Err(ObjectError::PrototypeCycle));
        assert_eq!(a.set_prototype(&shapes, Some(a.clone())), Err(ObjectError::PrototypeCycle));
        assert!(a.proto().is_none());
        assert_eq!(a.shape_id(), before);
    }

    #[test]
    fn test_prevent_extensions() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        body.prevent_extensions(&shapes);
        assert_eq!(
            body.add_own(&shapes, "x", Value::Int(1), PropertyAttrs::DEFAULT),
            Err(ObjectError::NotExtensible)
        );
    }

    #[test]
    fn test_array_dense_and_sparse() {
        let shapes = Heap::default();
        let array = ObjectRef::new(&shapes, None, ObjectKind::Array(ArrayStorage::default()));
        let mut body = array.borrow_mut();
        body.add_own(&shapes, "0", Value::Int(1), PropertyAttrs::DEFAULT).unwrap();
        body.add_own(&shapes, "3", Value::Int(4), PropertyAttrs::DEFAULT).unwrap();
        assert_eq!(body.array().map(|s| s.elements.len()), Some(4));
        body.add_own(&shapes, "100000", Value::Int(5), PropertyAttrs::DEFAULT).unwrap();
        let storage = body.array().unwrap();
        assert!(storage.sparse);
        assert_eq!(storage.length, 100001);
        assert!(body.has_own("100000"));

        body.set_array_length(&shapes, 2).unwrap();
        assert!(!body.has_own("100000"));
        assert!(!body.has_own("3"));
        assert!(matches!(body.get_own("length"), Some(OwnProperty::Data { value: Value::Int(2), .. })));
    }

    #[test]
    fn test_array_holes_are_not_own_properties() {
        let shapes = Heap::default();
        let storage = ArrayStorage::with_holes(vec![Some(Value::Int(1)), None, Some(Value::Int(3))]);
        let array = ObjectRef::new(&shapes, None, ObjectKind::Array(storage));
        let mut body = array.borrow_mut();
        assert!(!body.has_own("1"));
        assert!(body.has_own("2"));
        let keys: Vec<String> = body.own_keys(true).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2"]);

        assert!(body.delete_own(&shapes, "0"));
        assert!(!body.has_own("0"));
        assert!(matches!(body.get_own("length"), Some(OwnProperty::Data { value: Value::Int(3), .. })));

        assert!(body.delete_own(&shapes, "2"));
        assert_eq!(body.array().map(|s| s.elements.len()), Some(0));
        assert_eq!(body.array().map(|s| s.length), Some(3));

        body.add_own(&shapes, "1", Value::Int(7), PropertyAttrs::DEFAULT).unwrap();
        let keys: Vec<String> = body.own_keys(true).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["1"]);
    }

    #[test]
    fn test_define_rejects_redefinition_of_frozen() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        body.define_own_property(&shapes, "k", PropertyDescriptor::data(Value::Int(1), PropertyAttrs::FROZEN))
            .unwrap();
        let change = PropertyDescriptor {
            value: Some(Value::Int(2)),
            ..Default::default()
        };
        assert!(matches!(
            body.define_own_property(&shapes, "k", change),
            Err(ObjectError::NotConfigurable(_))
        ));
        let same = PropertyDescriptor {
            value: Some(Value::Int(1)),
            ..Default::default()
        };
        assert!(body.define_own_property(&shapes, "k", same).is_ok());
    }

    #[test]
    fn test_define_keeps_unspecified_attributes() {
        let shapes = Heap::default();
        let object = plain(&shapes);
        let mut body = object.borrow_mut();
        body.add_own(&shapes, "k", Value::Int(1), PropertyAttrs::DEFAULT).unwrap();
        let hide = PropertyDescriptor {
            enumerable: Some(false),
            ..Default::default()
        };
        body.define_own_property(&shapes, "k", hide).unwrap();
        let attrs = body.get_own("k").unwrap().attrs();
        assert!(attrs.writable() && attrs.configurable() && !attrs.enumerable());
    }

    #[test]
    fn test_string_wrapper_exposes_units() {
        let shapes = Heap::default();
        let wrapper = ObjectRef::new(&shapes, None, ObjectKind::Primitive(Value::from("hi")));
        let body = wrapper.borrow();
        assert!(matches!(body.get_own("length"), Some(OwnProperty::Data { value: Value::Int(2), .. })));
        assert!(body.is_exotic_key("1"));
        assert_eq!(body.own_keys(false).len(), 3);
    }
}
