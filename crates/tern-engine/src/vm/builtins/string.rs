//! `String` and `String.prototype`.

use super::{arg, define_constructor, define_method};
use crate::vm::convert::code_unit_at;
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{ObjectKind, ObjectRef};
use crate::vm::realm::Realm;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let proto = &realm.intrinsics.string_prototype;
    define_constructor(realm, "String", string, 1, proto);
    define_method(realm, proto, "charAt", char_at, 1);
    define_method(realm, proto, "toString", value_of, 0);
    define_method(realm, proto, "valueOf", value_of, 0);
}

fn string(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], construct: bool) -> VmResult<Value> {
    let text = match args.first() {
        Some(value) => interp.to_string(value)?,
        None => "".into(),
    };
    if !construct {
        return Ok(Value::String(text));
    }
    let wrapper = ObjectRef::new(
        interp.shapes(),
        Some(interp.realm().intrinsics.string_prototype.clone()),
        ObjectKind::Primitive(Value::String(text)),
    );
    Ok(Value::Object(wrapper))
}

fn char_at(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    if this.is_nullish() {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "String.prototype.charAt called on null or undefined",
        ));
    }
    let text = interp.to_string(this)?;
    let position = interp.to_number(&arg(args, 0))?;
    let position = if position.is_nan() { 0.0 } else { position.trunc() };
    if position < 0.0 {
        return Ok(Value::from(""));
    }
    Ok(Value::from(code_unit_at(&text, position as usize).unwrap_or_default()))
}

/// `toString` and `valueOf` share one body: both unwrap the receiver.
fn value_of(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    match this {
        Value::String(_) => Ok(this.clone()),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Primitive(value @ Value::String(_)) => Ok(value.clone()),
            _ => Err(interp.throw(ErrorKind::TypeError, "String.prototype.valueOf requires that 'this' be a String")),
        },
        _ => Err(interp.throw(ErrorKind::TypeError, "String.prototype.valueOf requires that 'this' be a String")),
    }
}
