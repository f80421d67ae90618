//! Conversions and operators.
//!
//! The generic paths follow the ES5.1 abstract operations. The speculative
//! paths only accept operands matching their optimistic type and report
//! every outcome to the unit's speculation table.

use std::cmp::Ordering;
use std::rc::Rc;

use super::Interpreter;
use crate::analysis::OptType;
use crate::compiler::ir::{BinaryOp, Speculation, UnaryOp};
use crate::vm::convert::{
    primitive_to_number, primitive_to_string, strict_equals, string_to_number, to_boolean, to_int32, to_uint32,
    typeof_name,
};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::object::{ObjectKind, ObjectRef};
use crate::vm::unit::UnitCode;
use crate::vm::value::Value;

/// Preferred type for `ToPrimitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Number,
    String,
}

/// Int32 arithmetic that refuses results outside int32, fractional
/// quotients and `-0`.
fn int32_arith(op: BinaryOp, l: i32, r: i32) -> Option<i32> {
    match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => {
            let product = l.checked_mul(r)?;
            if product == 0 && (l < 0 || r < 0) {
                None
            } else {
                Some(product)
            }
        }
        BinaryOp::Div => {
            if r == 0 || (l == 0 && r < 0) {
                return None;
            }
            if l.checked_rem(r)? != 0 {
                return None;
            }
            l.checked_div(r)
        }
        BinaryOp::Mod => {
            if r == 0 {
                return None;
            }
            let rem = l.checked_rem(r)?;
            if rem == 0 && l < 0 {
                None
            } else {
                Some(rem)
            }
        }
        _ => None,
    }
}

fn float_arith(op: BinaryOp, l: f64, r: f64) -> Option<f64> {
    match op {
        BinaryOp::Add => Some(l + r),
        BinaryOp::Sub => Some(l - r),
        BinaryOp::Mul => Some(l * r),
        BinaryOp::Div => Some(l / r),
        BinaryOp::Mod => Some(l % r),
        _ => None,
    }
}

fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

impl Interpreter<'_> {
    // ========================================================================
    // Speculation
    // ========================================================================

    /// Fast path of a speculative binary instruction. `None` sends the
    /// caller to the generic operation.
    pub(super) fn speculate_binary(
        &self,
        unit: &UnitCode,
        spec: Speculation,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Option<Value> {
        let mut table = unit.speculations.borrow_mut();
        if !table.is_live(spec.id) {
            return None;
        }
        let result = match spec.ty {
            OptType::Int32 => match (left, right) {
                (Value::Int(l), Value::Int(r)) => int32_arith(op, *l, *r).map(Value::Int),
                _ => None,
            },
            OptType::Number => match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => float_arith(op, l, r).map(Value::number),
                _ => None,
            },
            _ => None,
        };
        match result {
            Some(_) => table.record_success(spec.id, spec.ty),
            None => table.record_failure(spec.id),
        }
        result
    }

    pub(super) fn speculate_negate(&self, unit: &UnitCode, spec: Speculation, operand: &Value) -> Option<Value> {
        let mut table = unit.speculations.borrow_mut();
        if !table.is_live(spec.id) {
            return None;
        }
        let result = match (spec.ty, operand) {
            (OptType::Int32, Value::Int(i)) if *i != 0 && *i != i32::MIN => Some(Value::Int(-i)),
            (OptType::Number, value) => value.as_number().map(|n| Value::number(-n)),
            _ => None,
        };
        match result {
            Some(_) => table.record_success(spec.id, spec.ty),
            None => table.record_failure(spec.id),
        }
        result
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> VmResult<Value> {
        let Value::Object(object) = value else {
            return Ok(value.clone());
        };
        let order = match hint {
            Hint::Number => ["valueOf", "toString"],
            Hint::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = self.get_from(object, name, value)?;
            if method.as_object().is_some_and(|m| m.is_callable()) {
                let result = self.call(&method, value.clone(), &[])?;
                if !matches!(result, Value::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Err(self.throw(ErrorKind::TypeError, "Cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &Value) -> VmResult<f64> {
        if let Some(number) = primitive_to_number(value) {
            return Ok(number);
        }
        let primitive = self.to_primitive(value, Hint::Number)?;
        Ok(primitive_to_number(&primitive).unwrap_or(f64::NAN))
    }

    pub fn to_string(&mut self, value: &Value) -> VmResult<Rc<str>> {
        if let Some(text) = primitive_to_string(value) {
            return Ok(text);
        }
        let primitive = self.to_primitive(value, Hint::String)?;
        Ok(primitive_to_string(&primitive).unwrap_or_else(|| Rc::from("")))
    }

    pub fn to_property_key(&mut self, value: &Value) -> VmResult<Rc<str>> {
        match value {
            Value::String(key) => Ok(key.clone()),
            Value::Int(i) => Ok(Rc::from(i.to_string())),
            other => self.to_string(other),
        }
    }

    pub fn to_object(&mut self, value: &Value) -> VmResult<ObjectRef> {
        let realm = self.realm;
        let intrinsics = &realm.intrinsics;
        let proto = match value {
            Value::Object(object) => return Ok(object.clone()),
            Value::Undefined | Value::Null => {
                return Err(self.throw(ErrorKind::TypeError, "Cannot convert undefined or null to object"))
            }
            Value::String(_) => &intrinsics.string_prototype,
            Value::Int(_) | Value::Number(_) => &intrinsics.number_prototype,
            Value::Boolean(_) => &intrinsics.boolean_prototype,
        };
        Ok(ObjectRef::new(
            self.shapes(),
            Some(proto.clone()),
            ObjectKind::Primitive(value.clone()),
        ))
    }

    pub fn to_int32(&mut self, value: &Value) -> VmResult<i32> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Ok(to_int32(self.to_number(other)?)),
        }
    }

    pub fn to_uint32(&mut self, value: &Value) -> VmResult<u32> {
        Ok(to_uint32(self.to_number(value)?))
    }

    /// The base of an element access must not be `undefined` or `null`.
    pub(super) fn require_object_coercible(&self, base: &Value, key: &Value, action: &str) -> VmResult<()> {
        if base.is_nullish() {
            return Err(self.throw(
                ErrorKind::TypeError,
                format!("Cannot {} property '{}' of {}", action, key, base),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub(super) fn unary(&mut self, op: UnaryOp, operand: &Value) -> VmResult<Value> {
        Ok(match op {
            UnaryOp::Neg => Value::number(-self.to_number(operand)?),
            UnaryOp::Not => Value::Boolean(!to_boolean(operand)),
            UnaryOp::BitNot => Value::Int(!self.to_int32(operand)?),
            UnaryOp::Typeof => Value::from(typeof_name(operand)),
        })
    }

    pub(super) fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> VmResult<Value> {
        Ok(match op {
            BinaryOp::Add => self.add(left, right)?,
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.to_number(left)?;
                let r = self.to_number(right)?;
                Value::number(float_arith(op, l, r).unwrap_or(f64::NAN))
            }
            BinaryOp::Eq => Value::Boolean(self.loose_equals(left, right)?),
            BinaryOp::Ne => Value::Boolean(!self.loose_equals(left, right)?),
            BinaryOp::StrictEq => Value::Boolean(strict_equals(left, right)),
            BinaryOp::StrictNe => Value::Boolean(!strict_equals(left, right)),
            BinaryOp::Lt => Value::Boolean(self.less_than(left, right, true)? == Some(true)),
            BinaryOp::Gt => Value::Boolean(self.less_than(right, left, false)? == Some(true)),
            BinaryOp::Le => Value::Boolean(self.less_than(right, left, false)? == Some(false)),
            BinaryOp::Ge => Value::Boolean(self.less_than(left, right, true)? == Some(false)),
            BinaryOp::BitAnd => Value::Int(self.to_int32(left)? & self.to_int32(right)?),
            BinaryOp::BitOr => Value::Int(self.to_int32(left)? | self.to_int32(right)?),
            BinaryOp::BitXor => Value::Int(self.to_int32(left)? ^ self.to_int32(right)?),
            BinaryOp::Shl => {
                let l = self.to_int32(left)?;
                let shift = self.to_uint32(right)? & 31;
                Value::Int(l.wrapping_shl(shift))
            }
            BinaryOp::Shr => {
                let l = self.to_int32(left)?;
                let shift = self.to_uint32(right)? & 31;
                Value::Int(l >> shift)
            }
            BinaryOp::UShr => {
                let l = self.to_uint32(left)?;
                let shift = self.to_uint32(right)? & 31;
                Value::number((l >> shift) as f64)
            }
            BinaryOp::In => Value::Boolean(self.has_in(left, right)?),
            BinaryOp::InstanceOf => Value::Boolean(self.instance_of(left, right)?),
        })
    }

    fn add(&mut self, left: &Value, right: &Value) -> VmResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => return Ok(Value::number(*l as f64 + *r as f64)),
            (Value::String(l), Value::String(r)) => return Ok(Value::String(Rc::from(format!("{}{}", l, r)))),
            _ => {}
        }
        let l = self.to_primitive(left, Hint::Number)?;
        let r = self.to_primitive(right, Hint::Number)?;
        if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
            let l = self.to_string(&l)?;
            let r = self.to_string(&r)?;
            return Ok(Value::String(Rc::from(format!("{}{}", l, r))));
        }
        let l = self.to_number(&l)?;
        let r = self.to_number(&r)?;
        Ok(Value::number(l + r))
    }

    /// Abstract relational comparison. `None` means a NaN was involved.
    /// Operands are converted in source order, left first.
    fn less_than(&mut self, x: &Value, y: &Value, left_first: bool) -> VmResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, Hint::Number)?;
            let py = self.to_primitive(y, Hint::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(y, Hint::Number)?;
            let px = self.to_primitive(x, Hint::Number)?;
            (px, py)
        };
        if let (Value::String(a), Value::String(b)) = (&px, &py) {
            return Ok(Some(compare_utf16(a, b) == Ordering::Less));
        }
        let a = self.to_number(&px)?;
        let b = self.to_number(&py)?;
        if a.is_nan() || b.is_nan() {
            return Ok(None);
        }
        Ok(Some(a < b))
    }

    /// `==`
    pub fn loose_equals(&mut self, a: &Value, b: &Value) -> VmResult<bool> {
        if a.is_number() && b.is_number() {
            return Ok(strict_equals(a, b));
        }
        Ok(match (a, b) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::String(_), Value::String(_))
            | (Value::Boolean(_), Value::Boolean(_))
            | (Value::Object(_), Value::Object(_)) => strict_equals(a, b),
            (Value::String(s), n) | (n, Value::String(s)) if n.is_number() => {
                n.as_number().unwrap_or(f64::NAN) == string_to_number(s)
            }
            (Value::Boolean(x), other) | (other, Value::Boolean(x)) => {
                return self.loose_equals(&Value::Int(*x as i32), other)
            }
            (Value::Object(_), other) | (other, Value::Object(_))
                if other.is_number() || matches!(other, Value::String(_)) =>
            {
                let object = if matches!(a, Value::Object(_)) { a } else { b };
                let primitive = self.to_primitive(object, Hint::Number)?;
                return self.loose_equals(&primitive, other);
            }
            _ => false,
        })
    }

    fn has_in(&mut self, key: &Value, target: &Value) -> VmResult<bool> {
        let Value::Object(object) = target else {
            return Err(self.throw(
                ErrorKind::TypeError,
                format!("Cannot use 'in' operator to search for '{}' in {}", key, target),
            ));
        };
        let key = self.to_property_key(key)?;
        self.has_property(object, &key)
    }

    pub fn instance_of(&mut self, value: &Value, constructor: &Value) -> VmResult<bool> {
        let function = match constructor {
            Value::Object(f) if f.is_callable() => f.clone(),
            _ => {
                return Err(self.throw(ErrorKind::TypeError, "Right-hand side of 'instanceof' is not callable"));
            }
        };
        let Value::Object(object) = value else {
            return Ok(false);
        };
        let Value::Object(prototype) = self.get_from(&function, "prototype", constructor)? else {
            return Err(self.throw(
                ErrorKind::TypeError,
                "Function has non-object prototype in instanceof check",
            ));
        };
        let mut cursor = object.proto();
        while let Some(current) = cursor {
            if current.ptr_eq(&prototype) {
                return Ok(true);
            }
            cursor = current.proto();
        }
        Ok(false)
    }
}
