//! `Number` and `Boolean` wrappers.

use super::{define_constructor, define_method};
use crate::vm::convert::{number_to_string, to_boolean};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{ObjectKind, ObjectRef};
use crate::vm::realm::Realm;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let number_proto = &realm.intrinsics.number_prototype;
    define_constructor(realm, "Number", number, 1, number_proto);
    define_method(realm, number_proto, "toString", number_to_string_method, 0);
    define_method(realm, number_proto, "valueOf", number_value_of, 0);

    let boolean_proto = &realm.intrinsics.boolean_prototype;
    define_constructor(realm, "Boolean", boolean, 1, boolean_proto);
    define_method(realm, boolean_proto, "toString", boolean_to_string, 0);
    define_method(realm, boolean_proto, "valueOf", boolean_value_of, 0);
}

fn wrap(interp: &Interpreter<'_>, proto: &ObjectRef, value: Value) -> Value {
    Value::Object(ObjectRef::new(
        interp.shapes(),
        Some(proto.clone()),
        ObjectKind::Primitive(value),
    ))
}

/// Primitive held by `this`, when it is one of `matches`.
fn this_primitive(this: &Value, matches: fn(&Value) -> bool) -> Option<Value> {
    match this {
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Primitive(value) if matches(value) => Some(value.clone()),
            _ => None,
        },
        other if matches(other) => Some(other.clone()),
        _ => None,
    }
}

fn number(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], construct: bool) -> VmResult<Value> {
    let value = match args.first() {
        Some(value) => Value::number(interp.to_number(value)?),
        None => Value::Int(0),
    };
    if construct {
        let proto = interp.realm().intrinsics.number_prototype.clone();
        return Ok(wrap(interp, &proto, value));
    }
    Ok(value)
}

fn this_number(interp: &Interpreter<'_>, this: &Value) -> VmResult<f64> {
    this_primitive(this, Value::is_number)
        .and_then(|value| value.as_number())
        .ok_or_else(|| interp.throw(ErrorKind::TypeError, "Number.prototype.valueOf requires that 'this' be a Number"))
}

fn number_to_string_method(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::from(number_to_string(this_number(interp, this)?)))
}

fn number_value_of(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::number(this_number(interp, this)?))
}

fn boolean(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], construct: bool) -> VmResult<Value> {
    let value = Value::Boolean(args.first().is_some_and(to_boolean));
    if construct {
        let proto = interp.realm().intrinsics.boolean_prototype.clone();
        return Ok(wrap(interp, &proto, value));
    }
    Ok(value)
}

fn this_boolean(interp: &Interpreter<'_>, this: &Value) -> VmResult<bool> {
    this_primitive(this, |v| matches!(v, Value::Boolean(_)))
        .and_then(|value| value.as_bool())
        .ok_or_else(|| interp.throw(ErrorKind::TypeError, "Boolean.prototype.valueOf requires that 'this' be a Boolean"))
}

fn boolean_to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::from(if this_boolean(interp, this)? { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Boolean(this_boolean(interp, this)?))
}
