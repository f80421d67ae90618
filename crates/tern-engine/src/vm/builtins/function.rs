//! `Function` and `Function.prototype`.

use super::{arg, define_constructor, define_method};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{FunctionKind, ObjectKind};
use crate::vm::realm::Realm;
use crate::vm::value::Value;

pub fn install(realm: &Realm) {
    let proto = &realm.intrinsics.function_prototype;
    define_constructor(realm, "Function", function, 1, proto);
    define_method(realm, proto, "call", call, 1);
    define_method(realm, proto, "apply", apply, 2);
    define_method(realm, proto, "toString", to_string, 0);
}

/// `Function.prototype` itself: accepts anything, returns `undefined`.
pub fn empty(_interp: &mut Interpreter<'_>, _this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    Ok(Value::Undefined)
}

/// `new Function(p1, ..., body)` compiles a fresh script in the global
/// scope.
fn function(interp: &mut Interpreter<'_>, _this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (interp.to_string(body)?, params),
        None => ("".into(), args),
    };
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        names.push(interp.to_string(param)?);
    }
    let source = format!("(function anonymous({}\n) {{\n{}\n}})", names.join(","), body);
    interp.eval_source(&source)
}

fn call(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let rest = args.get(1..).unwrap_or(&[]);
    interp.call(this, arg(args, 0), rest)
}

fn apply(interp: &mut Interpreter<'_>, this: &Value, args: &[Value], _construct: bool) -> VmResult<Value> {
    let list = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(array) => {
            let target = Value::Object(array.clone());
            let length = interp.get_from(&array, "length", &target)?;
            let length = interp.to_uint32(&length)?;
            let mut list = Vec::with_capacity(length.min(1 << 16) as usize);
            for index in 0..length {
                list.push(interp.get_from(&array, &index.to_string(), &target)?);
            }
            list
        }
        other => {
            return Err(interp.throw(
                ErrorKind::TypeError,
                format!("CreateListFromArrayLike called on non-object {}", other),
            ))
        }
    };
    interp.call(this, arg(args, 0), &list)
}

fn to_string(interp: &mut Interpreter<'_>, this: &Value, _args: &[Value], _construct: bool) -> VmResult<Value> {
    let Value::Object(object) = this else {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "Function.prototype.toString requires that 'this' be a Function",
        ));
    };
    let text = match &object.borrow().kind {
        ObjectKind::Function(FunctionKind::Native(native)) => {
            format!("function {}() {{ [native code] }}", native.name)
        }
        ObjectKind::Function(FunctionKind::Script(closure)) => {
            let name = closure
                .unit
                .module
                .function(closure.function)
                .map(|f| f.name.clone().unwrap_or_else(|| "".into()))
                .unwrap_or_else(|| "".into());
            format!("function {}() {{ [code] }}", name)
        }
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(interp.throw(
            ErrorKind::TypeError,
            "Function.prototype.toString requires that 'this' be a Function",
        ));
    }
    Ok(Value::from(text))
}
