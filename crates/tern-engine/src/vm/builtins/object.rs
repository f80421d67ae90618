//! `Object` and `Object.prototype`.

use super::{arg, define_constructor, define_method, native_function};
use crate::vm::convert::to_boolean;
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{ObjectError, ObjectKind, ObjectRef, OwnProperty, PropertyDescriptor, Slot};
use crate::vm::realm::Realm;
use crate::vm::shape::PropertyAttrs;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let proto = &realm.intrinsics.object_prototype;
    let constructor = define_constructor(realm, "Object", object, 1, proto);
    define_method(realm, &constructor, "create", create, 2);
    define_method(realm, &constructor, "keys", keys, 1);
    define_method(realm, &constructor, "getOwnPropertyNames", get_own_property_names, 1);
    define_method(realm, &constructor, "defineProperty", define_property, 3);
    define_method(realm, &constructor, "defineProperties", define_properties, 2);
    define_method(realm, &constructor, "getOwnPropertyDescriptor", get_own_property_descriptor, 2);
    define_method(realm, &constructor, "getPrototypeOf", get_prototype_of, 1);
    define_method(realm, &constructor, "setPrototypeOf", set_prototype_of, 2);
    define_method(realm, &constructor, "preventExtensions", prevent_extensions, 1);
    define_method(realm, &constructor, "isExtensible", is_extensible, 1);

    define_method(realm, proto, "hasOwnProperty", has_own_property, 1);
    define_method(realm, proto, "isPrototypeOf", is_prototype_of, 1);
    define_method(realm, proto, "propertyIsEnumerable", property_is_enumerable, 1);
    define_method(realm, proto, "toString", to_string, 0);
    define_method(realm, proto, "valueOf", value_of, 0);

    let getter = native_function(realm, "get __proto__", proto_getter, 0, false);
    let setter = native_function(realm, "set __proto__", proto_setter, 1, false);
    proto.borrow_mut().define_raw(
        &realm.heap,
        "__proto__",
        Slot::Accessor {
            getter: Some(getter),
            setter: Some(setter),
        },
        PropertyAttrs::accessor(false, true),
    );
}

fn require_object(interp: &Interpreter<'_>, value: &Value, caller: &str) -> VmResult<ObjectRef> {
    match value {
        Value::Object(object) => Ok(object.clone()),
        other => Err(interp.throw(
            ErrorKind::TypeError,
            format!("{} called on non-object {}", caller, other),
        )),
    }
}

/// Prototype argument of `Object.create`/`setPrototypeOf`.
fn prototype_arg(interp: &Interpreter<'_>, value: &Value) -> VmResult<Option<ObjectRef>> {
    match value {
        Value::Object(proto) => Ok(Some(proto.clone())),
        Value::Null => Ok(None),
        other => Err(interp.throw(
            ErrorKind::TypeError,
            format!("Object prototype may only be an Object or null: {}", other),
        )),
    }
}

fn set_prototype(interp: &Interpreter<'_>, object: &ObjectRef, proto: Option<ObjectRef>) -> VmResult<()> {
    object.set_prototype(interp.shapes(), proto).map_err(|err| match err {
        ObjectError::NotExtensible => interp.throw(
            ErrorKind::TypeError,
            format!("{} is not extensible", Value::Object(object.clone())),
        ),
        other => interp.object_error(other),
    })
}

/// `ToPropertyDescriptor`
pub fn to_property_descriptor(interp: &mut Interpreter<'_>, value: &Value) -> VmResult<PropertyDescriptor> {
    let Value::Object(object) = value else {
        return Err(interp.throw(
            ErrorKind::TypeError,
            format!("Property description must be an object: {}", value),
        ));
    };
    let field = |interp: &mut Interpreter<'_>, name: &str| -> VmResult<Option<Value>> {
        if interp.has_property(object, name)? {
            Ok(Some(interp.get_from(object, name, value)?))
        } else {
            Ok(None)
        }
    };
    let enumerable = field(interp, "enumerable")?.map(|v| to_boolean(&v));
    let configurable = field(interp, "configurable")?.map(|v| to_boolean(&v));
    let value_field = field(interp, "value")?;
    let writable = field(interp, "writable")?.map(|v| to_boolean(&v));
    let get = field(interp, "get")?;
    let set = field(interp, "set")?;

    let accessor = |interp: &Interpreter<'_>, f: Option<Value>, what: &str| -> VmResult<Option<Option<ObjectRef>>> {
        match f {
            None => Ok(None),
            Some(Value::Undefined) => Ok(Some(None)),
            Some(Value::Object(function)) if function.is_callable() => Ok(Some(Some(function))),
            Some(other) => Err(interp.throw(
                ErrorKind::TypeError,
                format!("{} must be a function: {}", what, other),
            )),
        }
    };
    let desc = PropertyDescriptor {
        value: value_field,
        writable,
        get: accessor(interp, get, "Getter")?,
        set: accessor(interp, set, "Setter")?,
        enumerable,
        configurable,
    };
    if desc.is_accessor() && desc.is_data() {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// `FromPropertyDescriptor`
fn from_property(interp: &mut Interpreter<'_>, property: OwnProperty) -> VmResult<Value> {
    let result = interp.new_object();
    let attrs = property.attrs();
    let mut fields: Vec<(&str, Value)> = match property {
        OwnProperty::Data { value, .. } => vec![("value", value), ("writable", Value::Boolean(attrs.writable()))],
        OwnProperty::Accessor { getter, setter, .. } => vec![
            ("get", getter.map(Value::Object).unwrap_or_default()),
            ("set", setter.map(Value::Object).unwrap_or_default()),
        ],
    };
    fields.push(("enumerable", Value::Boolean(attrs.enumerable())));
    fields.push(("configurable", Value::Boolean(attrs.configurable())));
    for (name, value) in fields {
        interp.define_property(&result, name, PropertyDescriptor::data(value, PropertyAttrs::DEFAULT))?;
    }
    Ok(Value::Object(result))
}

fn own_keys(object: &ObjectRef, only_enumerable: bool) -> Vec<Value> {
    let body = object.borrow();
    if let ObjectKind::Host(_) = body.kind {
        return Vec::new();
    }
    body.own_keys(only_enumerable)
        .into_iter()
        .map(Value::String)
        .collect()
}

// ============================================================================
// Object
// ============================================================================

fn object(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Object(interp.new_object()));
    }
    Ok(Value::Object(interp.to_object(&value)?))
}

fn create(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let proto = prototype_arg(interp, &arg(args, 0))?;
    let object = ObjectRef::new(interp.shapes(), proto, ObjectKind::Ordinary);
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        apply_properties(interp, &object, &properties)?;
    }
    Ok(Value::Object(object))
}

fn keys(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.keys")?;
    Ok(Value::Object(interp.new_array(own_keys(&object, true))))
}

fn get_own_property_names(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getOwnPropertyNames")?;
    Ok(Value::Object(interp.new_array(own_keys(&object, false))))
}

fn define_property(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let target = arg(args, 0);
    let object = require_object(interp, &target, "Object.defineProperty")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    let desc = to_property_descriptor(interp, &arg(args, 2))?;
    interp.define_property(&object, &key, desc)?;
    Ok(target)
}

fn apply_properties(interp: &mut Interpreter<'_>, object: &ObjectRef, properties: &Value) -> VmResult<()> {
    let props = interp.to_object(properties)?;
    let mut descriptors = Vec::new();
    for key in props.borrow().own_keys(true) {
        descriptors.push(key);
    }
    let mut resolved = Vec::with_capacity(descriptors.len());
    for key in descriptors {
        let desc = interp.get_from(&props, &key, properties)?;
        resolved.push((key, to_property_descriptor(interp, &desc)?));
    }
    for (key, desc) in resolved {
        interp.define_property(object, &key, desc)?;
    }
    Ok(())
}

fn define_properties(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let target = arg(args, 0);
    let object = require_object(interp, &target, "Object.defineProperties")?;
    apply_properties(interp, &object, &arg(args, 1))?;
    Ok(target)
}

fn get_own_property_descriptor(
    interp: &mut Interpreter<'_>,
    _this: &Value,
    args: &[Value],
    _construct: bool,
) -> VmResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getOwnPropertyDescriptor")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    let property = {
        let body = object.borrow();
        match body.kind {
            ObjectKind::Host(_) => None,
            _ => body.get_own(&key),
        }
    };
    match property {
        Some(property) => from_property(interp, property),
        None => Ok(Value::Undefined),
    }
}

fn get_prototype_of(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = require_object(interp, &arg(args, 0), "Object.getPrototypeOf")?;
    Ok(object.proto().map(Value::Object).unwrap_or(Value::Null))
}

fn set_prototype_of(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(interp.throw(ErrorKind::TypeError, "Object.setPrototypeOf called on null or undefined"));
    }
    let proto = prototype_arg(interp, &arg(args, 1))?;
    if let Value::Object(object) = &target {
        set_prototype(interp, object, proto)?;
    }
    Ok(target)
}

fn prevent_extensions(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let target = arg(args, 0);
    if let Value::Object(object) = &target {
        object.borrow_mut().prevent_extensions(interp.shapes());
    }
    Ok(target)
}

fn is_extensible(_interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Boolean(match arg(args, 0) {
        Value::Object(object) => object.borrow().is_extensible(),
        _ => false,
    }))
}

// ============================================================================
// Object.prototype
// ============================================================================

fn has_own_property(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let object = interp.to_object(this)?;
    let found = match object.host() {
        Some(host) => host.has_property(&key),
        None => object.borrow().has_own(&key),
    };
    Ok(Value::Boolean(found))
}

fn is_prototype_of(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let Value::Object(value) = arg(args, 0) else {
        return Ok(Value::Boolean(false));
    };
    let object = interp.to_object(this)?;
    let mut cursor = value.proto();
    while let Some(current) = cursor {
        if current.ptr_eq(&object) {
            return Ok(Value::Boolean(true));
        }
        cursor = current.proto();
    }
    Ok(Value::Boolean(false))
}

fn property_is_enumerable(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let object = interp.to_object(this)?;
    let enumerable = object
        .borrow()
        .get_own(&key)
        .is_some_and(|property| property.attrs().enumerable());
    Ok(Value::Boolean(enumerable))
}

fn to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    let tag = match this {
        Value::Undefined => "Undefined".to_string(),
        Value::Null => "Null".to_string(),
        other => {
            let object = interp.to_object(other)?;
            match object.host() {
                Some(host) => host.class_name().to_string(),
                None => object.class_name().to_string(),
            }
        }
    };
    Ok(Value::from(format!("[object {}]", tag)))
}

fn value_of(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Object(interp.to_object(this)?))
}

fn proto_getter(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = interp.to_object(this)?;
    Ok(object.proto().map(Value::Object).unwrap_or(Value::Null))
}

fn proto_setter(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    if this.is_nullish() {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "Object.prototype.__proto__ called on null or undefined",
        ));
    }
    let proto = match arg(args, 0) {
        Value::Object(proto) => Some(proto),
        Value::Null => None,
        _ => return Ok(Value::Undefined),
    };
    if let Value::Object(object) = this {
        set_prototype(interp, object, proto)?;
    }
    Ok(Value::Undefined)
}
