//! A realm: the global object plus the intrinsic prototypes every new
//! object links to.

use std::sync::Arc;

use super::builtins;
use super::error::ErrorKind;
use super::object::{ArrayStorage, FunctionKind, Heap, NativeFunction, ObjectKind, ObjectRef};
use super::shape::ShapeTable;
use super::value::Value;

pub struct Intrinsics {
    pub object_prototype: ObjectRef,
    pub function_prototype: ObjectRef,
    pub array_prototype: ObjectRef,
    pub string_prototype: ObjectRef,
    pub number_prototype: ObjectRef,
    pub boolean_prototype: ObjectRef,
    pub regexp_prototype: ObjectRef,
    pub error_prototype: ObjectRef,
    /// Prototypes of `TypeError`, `ReferenceError`, `RangeError` and
    /// `SyntaxError`
    pub native_error_prototypes: Vec<(ErrorKind, ObjectRef)>,
}

impl Intrinsics {
    /// Prototype for errors of `kind`; `Error.prototype` for kinds without
    /// their own constructor.
    pub fn error_prototype_for(&self, kind: ErrorKind) -> &ObjectRef {
        self.native_error_prototypes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, proto)| proto)
            .unwrap_or(&self.error_prototype)
    }
}

pub struct Realm {
    pub global: ObjectRef,
    pub intrinsics: Intrinsics,
    /// Objects of this realm and the engine shape table they share.
    pub heap: Heap,
}

impl Realm {
    pub fn new(shapes: Arc<ShapeTable>) -> Realm {
        let heap = Heap::new(shapes);
        let table = &heap;
        let object_prototype = ObjectRef::new(table, None, ObjectKind::Ordinary);
        let child = |kind: ObjectKind| ObjectRef::new(table, Some(object_prototype.clone()), kind);
        let function_prototype = child(ObjectKind::Function(FunctionKind::Native(NativeFunction {
            name: "",
            call: builtins::function::empty,
            constructible: false,
        })));
        let error_prototype = child(ObjectKind::Ordinary);
        let native_error_prototypes = [
            ErrorKind::TypeError,
            ErrorKind::ReferenceError,
            ErrorKind::RangeError,
            ErrorKind::SyntaxError,
        ]
        .into_iter()
        .map(|kind| {
            (
                kind,
                ObjectRef::new(table, Some(error_prototype.clone()), ObjectKind::Ordinary),
            )
        })
        .collect();
        let intrinsics = Intrinsics {
            array_prototype: child(ObjectKind::Array(ArrayStorage::default())),
            string_prototype: child(ObjectKind::Primitive(Value::from(""))),
            number_prototype: child(ObjectKind::Primitive(Value::Int(0))),
            boolean_prototype: child(ObjectKind::Primitive(Value::Boolean(false))),
            regexp_prototype: child(ObjectKind::Ordinary),
            function_prototype,
            error_prototype,
            native_error_prototypes,
            object_prototype: object_prototype.clone(),
        };
        let global = ObjectRef::new(table, Some(object_prototype), ObjectKind::Ordinary);
        let realm = Realm {
            global,
            intrinsics,
            heap,
        };
        builtins::install(&realm);
        log::debug!("realm ready, {} shape transitions", realm.heap.transition_count());
        realm
    }
}
