//! `Array` and the few `Array.prototype` methods scripts rely on.

use super::{arg, define_constructor, define_method};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::ObjectRef;
use crate::vm::realm::Realm;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let proto = &realm.intrinsics.array_prototype;
    let constructor = define_constructor(realm, "Array", array, 1, proto);
    define_method(realm, &constructor, "isArray", is_array, 1);
    define_method(realm, proto, "push", push, 1);
    define_method(realm, proto, "join", join, 1);
    define_method(realm, proto, "toString", to_string, 0);
}

/// `Array(len)` or `Array(a, b, ...)`; the same with or without `new`.
fn array(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    if let [length] = args {
        if let Some(n) = length.as_number() {
            if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
                return Err(interp.throw(ErrorKind::RangeError, "Invalid array length"));
            }
            let array = interp.new_array(Vec::new());
            array
                .borrow_mut()
                .set_array_length(interp.shapes(), n as u32)
                .map_err(|err| interp.object_error(err))?;
            return Ok(Value::Object(array));
        }
    }
    Ok(Value::Object(interp.new_array(args.to_vec())))
}

fn is_array(_interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Boolean(arg(args, 0).as_object().is_some_and(ObjectRef::is_array)))
}

fn length_of(interp: &mut Interpreter<'_>, object: &ObjectRef, receiver: &Value) -> VmResult<u32> {
    let length = interp.get_from(object, "length", receiver)?;
    interp.to_uint32(&length)
}

fn push(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = interp.to_object(this)?;
    let mut length = length_of(interp, &object, this)? as f64;
    for value in args {
        interp.put_on(&object, &Value::number(length).to_string(), value.clone(), true)?;
        length += 1.0;
    }
    let length = Value::number(length);
    interp.put_on(&object, "length", length.clone(), true)?;
    Ok(length)
}

fn join(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let object = interp.to_object(this)?;
    let length = length_of(interp, &object, this)?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".into(),
        other => interp.to_string(&other)?,
    };
    let mut out = String::new();
    for index in 0..length {
        if index > 0 {
            out.push_str(&separator);
        }
        let element = interp.get_from(&object, &index.to_string(), this)?;
        if !element.is_nullish() {
            out.push_str(&interp.to_string(&element)?);
        }
    }
    Ok(Value::from(out))
}

fn to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], construct: bool) -> VmResult<Value> {
    join(interp, this, &[], construct)
}
