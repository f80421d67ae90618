//! Builtin objects: the minimal library scripts and the compiler rely on.
//!
//! Every builtin is a [`NativeFn`] installed on its prototype or
//! constructor when a realm is created.

pub mod array;
pub mod error;
pub mod function;
pub mod global;
pub mod object;
pub mod primitive;
pub mod string;

use super::object::{FunctionKind, NativeFn, NativeFunction, ObjectKind, ObjectRef, Slot};
use super::realm::Realm;
use super::shape::PropertyAttrs;
use super::value::Value;

/// Populate the global object and the intrinsic prototypes.
pub fn install(realm: &Realm) {
    object::install(realm);
    function::install(realm);
    array::install(realm);
    string::install(realm);
    primitive::install(realm);
    error::install(realm);
    global::install(realm);
}

/// Argument `index`, or `undefined`.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

pub fn native_function(realm: &Realm, name: &'static str, call: NativeFn, length: u32, constructible: bool) -> ObjectRef {
    let shapes = &realm.heap;
    let function = ObjectRef::new(
        shapes,
        Some(realm.intrinsics.function_prototype.clone()),
        ObjectKind::Function(FunctionKind::Native(NativeFunction {
            name,
            call,
            constructible,
        })),
    );
    {
        let mut body = function.borrow_mut();
        body.define_raw(shapes, "length", Slot::Data(Value::Int(length as i32)), PropertyAttrs::FROZEN);
        body.define_raw(shapes, "name", Slot::Data(Value::from(name)), PropertyAttrs::FROZEN);
    }
    function
}

/// Non-enumerable data property, the attributes builtins use.
pub fn define_value(realm: &Realm, target: &ObjectRef, name: &str, value: Value) {
    target
        .borrow_mut()
        .define_raw(&realm.heap, name, Slot::Data(value), PropertyAttrs::HIDDEN);
}

pub fn define_method(realm: &Realm, target: &ObjectRef, name: &'static str, call: NativeFn, length: u32) {
    let function = native_function(realm, name, call, length, false);
    define_value(realm, target, name, Value::Object(function));
}

/// Install a global constructor linked both ways with `prototype`.
pub fn define_constructor(
    realm: &Realm,
    name: &'static str,
    call: NativeFn,
    length: u32,
    prototype: &ObjectRef,
) -> ObjectRef {
    let constructor = native_function(realm, name, call, length, true);
    constructor.borrow_mut().define_raw(
        &realm.heap,
        "prototype",
        Slot::Data(Value::Object(prototype.clone())),
        PropertyAttrs::FROZEN,
    );
    define_value(realm, prototype, "constructor", Value::Object(constructor.clone()));
    define_value(realm, &realm.global, name, Value::Object(constructor.clone()));
    constructor
}
