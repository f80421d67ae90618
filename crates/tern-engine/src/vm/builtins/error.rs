//! `Error` and the native error constructors.

use super::{arg, define_constructor, define_method, define_value};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{NativeFn, ObjectKind, ObjectRef, Slot};
use crate::vm::realm::Realm;
use crate::vm::shape::PropertyAttrs;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let constructors: [(ErrorKind, NativeFn); 5] = [
        (ErrorKind::Error, error),
        (ErrorKind::TypeError, type_error),
        (ErrorKind::ReferenceError, reference_error),
        (ErrorKind::RangeError, range_error),
        (ErrorKind::SyntaxError, syntax_error),
    ];
    for (kind, call) in constructors {
        let proto = realm.intrinsics.error_prototype_for(kind);
        define_constructor(realm, kind.name(), call, 1, proto);
        define_value(realm, proto, "name", Value::from(kind.name()));
        define_value(realm, proto, "message", Value::from(""));
    }
    define_method(realm, &realm.intrinsics.error_prototype, "toString", to_string, 0);
}

/// Shared body of every error constructor; `new` is optional.
fn construct_error(interp: &mut Interpreter<'_>, kind: ErrorKind, message: Value) -> VmResult<Value> {
    let proto = interp.realm().intrinsics.error_prototype_for(kind).clone();
    let error = ObjectRef::new(interp.shapes(), Some(proto), ObjectKind::Error);
    if !message.is_undefined() {
        let message = interp.to_string(&message)?;
        error.borrow_mut().define_raw(
            interp.shapes(),
            "message",
            Slot::Data(Value::String(message)),
            PropertyAttrs::HIDDEN,
        );
    }
    Ok(Value::Object(error))
}

fn error(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    construct_error(interp, ErrorKind::Error, arg(args, 0))
}

fn type_error(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    construct_error(interp, ErrorKind::TypeError, arg(args, 0))
}

fn reference_error(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    construct_error(interp, ErrorKind::ReferenceError, arg(args, 0))
}

fn range_error(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    construct_error(interp, ErrorKind::RangeError, arg(args, 0))
}

fn syntax_error(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    construct_error(interp, ErrorKind::SyntaxError, arg(args, 0))
}

fn to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    let Value::Object(object) = this else {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "Error.prototype.toString called on non-object",
        ));
    };
    let name = match interp.get_from(object, "name", this)? {
        Value::Undefined => "Error".into(),
        other => interp.to_string(&other)?,
    };
    let message = match interp.get_from(object, "message", this)? {
        Value::Undefined => "".into(),
        other => interp.to_string(&other)?,
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{}: {}", name, message),
    };
    Ok(Value::from(text))
}
