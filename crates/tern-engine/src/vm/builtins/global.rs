//! Global value properties and functions.

use super::{arg, define_method};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{ObjectKind, Slot};
use crate::vm::realm::Realm;
use crate::vm::shape::PropertyAttrs;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let global = &realm.global;
    {
        let mut body = global.borrow_mut();
        for (name, value) in [
            ("undefined", Value::Undefined),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
        ] {
            body.define_raw(&realm.heap, name, Slot::Data(value), PropertyAttrs::FROZEN);
        }
    }
    define_method(realm, global, "eval", eval, 1);
    define_method(realm, global, "isNaN", is_nan, 1);
    define_method(realm, global, "isFinite", is_finite, 1);

    define_method(realm, &realm.intrinsics.regexp_prototype, "toString", regexp_to_string, 0);
}

/// Global `eval`. Every call is indirect: the source runs as its own
/// script against the global object and sees no caller locals.
fn eval(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    match arg(args, 0) {
        Value::String(source) => interp.eval_source(&source),
        other => Ok(other),
    }
}

fn is_nan(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

fn is_finite(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}

fn regexp_to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    if let Value::Object(object) = this {
        if let ObjectKind::RegExp { source, flags } = &object.borrow().kind {
            return Ok(Value::from(format!("/{}/{}", source, flags)));
        }
    }
    Err(interp.throw(
        ErrorKind::TypeError,
        "RegExp.prototype.toString requires that 'this' be a RegExp",
    ))
}
