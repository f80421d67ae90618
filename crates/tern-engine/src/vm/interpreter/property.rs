//! Property access: the generic `[[Get]]`/`[[Put]]`/`[[Delete]]` paths and
//! their dispatch-site front ends.

use std::rc::Rc;

use super::Interpreter;
use crate::compiler::ir::SiteId;
use crate::vm::convert::{array_index, code_unit_at, utf16_len};
use crate::vm::dispatch::{resolve_call, resolve_get, resolve_set, Access, CallTarget, Probe, Target};
use crate::vm::error::{ErrorKind, VmResult};
use crate::vm::host::HostObject;
use crate::vm::object::{FunctionKind, ObjectError, ObjectKind, ObjectRef, OwnProperty, PropertyDescriptor, Slot};
use crate::vm::shape::PropertyAttrs;
use crate::vm::unit::UnitCode;
use crate::vm::value::Value;

/// Outcome of a `[[Get]]` step on one object of the chain.
enum GetStep {
    Value(Value),
    Getter(Option<ObjectRef>),
    Host(Rc<dyn HostObject>),
    Next(Option<ObjectRef>),
}

/// What a `[[Put]]` must do.
enum PutPlan {
    WriteOwn,
    Setter(Option<ObjectRef>),
    ReadOnly,
    Add,
    Host(Rc<dyn HostObject>),
}

/// Receivers a site may cache on.
fn cacheable(receiver: &Value, key: &str) -> Option<ObjectRef> {
    match receiver {
        Value::Object(object) if !object.borrow().is_exotic_key(key) => Some(object.clone()),
        _ => None,
    }
}

fn accessor_at(object: &ObjectRef, slot: u32) -> Option<(Option<ObjectRef>, Option<ObjectRef>)> {
    match object.borrow().slot(slot) {
        Some(Slot::Accessor { getter, setter }) => Some((getter.clone(), setter.clone())),
        _ => None,
    }
}

fn data_at(object: &ObjectRef, slot: u32) -> Option<Value> {
    match object.borrow().slot(slot) {
        Some(Slot::Data(value)) => Some(value.clone()),
        _ => None,
    }
}

impl Interpreter<'_> {
    // ========================================================================
    // Generic paths
    // ========================================================================

    /// `GetValue` on any base. Primitive bases read from their prototype
    /// without allocating a wrapper.
    pub fn get_value(&mut self, receiver: &Value, key: &str) -> VmResult<Value> {
        let realm = self.realm;
        let intrinsics = &realm.intrinsics;
        let proto = match receiver {
            Value::Object(object) => return self.get_from(object, key, receiver),
            Value::Undefined | Value::Null => {
                return Err(self.throw(
                    ErrorKind::TypeError,
                    format!("Cannot read property '{}' of {}", key, receiver),
                ));
            }
            Value::String(text) => {
                if key == "length" {
                    return Ok(Value::number(utf16_len(text) as f64));
                }
                if let Some(unit) = array_index(key).and_then(|i| code_unit_at(text, i as usize)) {
                    return Ok(Value::from(unit));
                }
                intrinsics.string_prototype.clone()
            }
            Value::Int(_) | Value::Number(_) => intrinsics.number_prototype.clone(),
            Value::Boolean(_) => intrinsics.boolean_prototype.clone(),
        };
        self.get_from(&proto, key, receiver)
    }

    /// `[[Get]]` starting at `object`; getters see `receiver` as `this`.
    pub fn get_from(&mut self, object: &ObjectRef, key: &str, receiver: &Value) -> VmResult<Value> {
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            let step = {
                let body = current.borrow();
                match &body.kind {
                    ObjectKind::Host(host) => GetStep::Host(host.clone()),
                    _ => match body.get_own(key) {
                        Some(OwnProperty::Data { value, .. }) => GetStep::Value(value),
                        Some(OwnProperty::Accessor { getter, .. }) => GetStep::Getter(getter),
                        None => GetStep::Next(body.proto().cloned()),
                    },
                }
            };
            cursor = match step {
                GetStep::Value(value) => return Ok(value),
                GetStep::Getter(Some(getter)) => return self.call(&Value::Object(getter), receiver.clone(), &[]),
                GetStep::Getter(None) => return Ok(Value::Undefined),
                GetStep::Host(host) if host.has_property(key) => {
                    return host.get_property(key).map_err(|e| self.host_error(e));
                }
                GetStep::Host(_) => current.proto(),
                GetStep::Next(next) => next,
            };
        }
        Ok(Value::Undefined)
    }

    /// `[[HasProperty]]`
    pub fn has_property(&mut self, object: &ObjectRef, key: &str) -> VmResult<bool> {
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            let host = current.host();
            if let Some(host) = host {
                if host.has_property(key) {
                    return Ok(true);
                }
            } else if current.borrow().has_own(key) {
                return Ok(true);
            }
            cursor = current.proto();
        }
        Ok(false)
    }

    fn put_plan(&self, object: &ObjectRef, key: &str) -> PutPlan {
        {
            let body = object.borrow();
            match &body.kind {
                ObjectKind::Host(host) => return PutPlan::Host(host.clone()),
                _ => match body.get_own(key) {
                    Some(OwnProperty::Data { attrs, .. }) if attrs.writable() => return PutPlan::WriteOwn,
                    Some(OwnProperty::Data { .. }) => return PutPlan::ReadOnly,
                    Some(OwnProperty::Accessor { setter, .. }) => return PutPlan::Setter(setter),
                    None => {}
                },
            }
        }
        let mut cursor = object.proto();
        while let Some(current) = cursor {
            let body = current.borrow();
            if let ObjectKind::Host(_) = body.kind {
                break;
            }
            match body.get_own(key) {
                Some(OwnProperty::Data { attrs, .. }) if attrs.writable() => break,
                Some(OwnProperty::Data { .. }) => return PutPlan::ReadOnly,
                Some(OwnProperty::Accessor { setter, .. }) => return PutPlan::Setter(setter),
                None => {}
            }
            cursor = body.proto().cloned();
        }
        PutPlan::Add
    }

    /// `PutValue` on any base.
    pub fn put_value(&mut self, target: &Value, key: &str, value: Value, strict: bool) -> VmResult<()> {
        match target {
            Value::Object(object) => self.put_on(object, key, value, strict),
            Value::Undefined | Value::Null => Err(self.throw(
                ErrorKind::TypeError,
                format!("Cannot set property '{}' of {}", key, target),
            )),
            primitive => {
                let wrapper = self.to_object(primitive)?;
                match self.put_plan(&wrapper, key) {
                    PutPlan::Setter(Some(setter)) => {
                        self.call(&Value::Object(setter), primitive.clone(), &[value])?;
                        Ok(())
                    }
                    _ if strict => Err(self.throw(
                        ErrorKind::TypeError,
                        format!("Cannot create property '{}' on {} '{}'", key, primitive.type_name(), primitive),
                    )),
                    _ => Ok(()),
                }
            }
        }
    }

    /// `[[Put]]` on an object.
    pub fn put_on(&mut self, object: &ObjectRef, key: &str, value: Value, strict: bool) -> VmResult<()> {
        match self.put_plan(object, key) {
            PutPlan::Host(host) => host.set_property(key, value).map_err(|e| self.host_error(e)),
            PutPlan::WriteOwn => {
                let result = object.borrow_mut().write_own(self.shapes(), key, value);
                result.map_err(|e| self.object_error(e))
            }
            PutPlan::Setter(setter) => self.invoke_setter(setter, &Value::Object(object.clone()), key, value, strict),
            PutPlan::ReadOnly => self.reject_put(strict, ObjectError::ReadOnly(key.to_string())),
            PutPlan::Add => {
                let result = object
                    .borrow_mut()
                    .add_own(self.shapes(), key, value, PropertyAttrs::DEFAULT);
                match result {
                    Ok(()) => Ok(()),
                    Err(ObjectError::NotExtensible) if !strict => Ok(()),
                    Err(ObjectError::NotExtensible) => Err(self.throw(
                        ErrorKind::TypeError,
                        format!("Cannot add property {}, object is not extensible", key),
                    )),
                    Err(err) => Err(self.object_error(err)),
                }
            }
        }
    }

    fn invoke_setter(
        &mut self,
        setter: Option<ObjectRef>,
        receiver: &Value,
        key: &str,
        value: Value,
        strict: bool,
    ) -> VmResult<()> {
        match setter {
            Some(setter) => {
                self.call(&Value::Object(setter), receiver.clone(), &[value])?;
                Ok(())
            }
            None if strict => Err(self.throw(
                ErrorKind::TypeError,
                format!("Cannot set property {} of {} which has only a getter", key, receiver),
            )),
            None => Ok(()),
        }
    }

    fn reject_put(&self, strict: bool, err: ObjectError) -> VmResult<()> {
        if strict {
            Err(self.object_error(err))
        } else {
            Ok(())
        }
    }

    /// `[[Delete]]`; strict code throws when the property is not
    /// configurable.
    pub fn delete_property(&mut self, object: &ObjectRef, key: &str, strict: bool) -> VmResult<bool> {
        let deleted = if object.host().is_some() {
            false
        } else {
            object.borrow_mut().delete_own(self.shapes(), key)
        };
        if !deleted && strict {
            return Err(self.throw(
                ErrorKind::TypeError,
                format!("Cannot delete property '{}' of {}", key, Value::Object(object.clone())),
            ));
        }
        Ok(deleted)
    }

    /// `[[DefineOwnProperty]]` with throwing semantics.
    pub fn define_property(&mut self, object: &ObjectRef, key: &str, desc: PropertyDescriptor) -> VmResult<()> {
        if object.host().is_some() {
            return Err(self.throw(ErrorKind::TypeError, "Cannot define property on a host object"));
        }
        let result = object.borrow_mut().define_own_property(self.shapes(), key, desc);
        result.map_err(|e| self.object_error(e))
    }

    // ========================================================================
    // Dispatch sites
    // ========================================================================

    /// Property read through `site`. `element` sites also guard on the key.
    pub(super) fn get_at_site(
        &mut self,
        unit: &UnitCode,
        site: SiteId,
        receiver: &Value,
        key: &str,
        element: bool,
    ) -> VmResult<Value> {
        let cached = {
            let mut sites = unit.sites.borrow_mut();
            match sites.get_mut(site.0 as usize).and_then(|entry| entry.enter().then_some(entry)) {
                Some(entry) => match cacheable(receiver, key) {
                    Some(object) => {
                        let key_guard = element.then_some(key);
                        let probe = Probe::Shape {
                            access: Access::Get,
                            shape: object.shape_id(),
                            key: key_guard,
                        };
                        match entry.lookup(&probe) {
                            Some(target) => Some((object, target)),
                            None => match resolve_get(&object, key, key_guard) {
                                Some(resolution) => {
                                    let target = resolution.target.clone();
                                    self.linker(unit.id).install(entry, resolution);
                                    Some((object, target))
                                }
                                None => {
                                    entry.note_generic();
                                    None
                                }
                            },
                        }
                    }
                    None => {
                        entry.note_generic();
                        None
                    }
                },
                _ => None,
            }
        };
        let Some((object, target)) = cached else {
            return self.get_value(receiver, key);
        };
        let value = match target {
            Target::OwnSlot(slot) => data_at(&object, slot),
            Target::ProtoSlot { holder, slot } => data_at(&holder, slot),
            Target::Getter { holder, slot } => {
                let holder = holder.unwrap_or_else(|| object.clone());
                match accessor_at(&holder, slot) {
                    Some((Some(getter), _)) => return self.call(&Value::Object(getter), receiver.clone(), &[]),
                    Some((None, _)) => Some(Value::Undefined),
                    None => None,
                }
            }
            Target::Absent => Some(Value::Undefined),
            _ => None,
        };
        match value {
            Some(value) => Ok(value),
            None => self.get_value(receiver, key),
        }
    }

    /// Property write through `site`.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn set_at_site(
        &mut self,
        unit: &UnitCode,
        site: SiteId,
        receiver: &Value,
        key: &str,
        value: Value,
        element: bool,
        strict: bool,
    ) -> VmResult<()> {
        let cached = {
            let mut sites = unit.sites.borrow_mut();
            match sites.get_mut(site.0 as usize).and_then(|entry| entry.enter().then_some(entry)) {
                Some(entry) => match cacheable(receiver, key) {
                    Some(object) => {
                        let key_guard = element.then_some(key);
                        let probe = Probe::Shape {
                            access: Access::Set,
                            shape: object.shape_id(),
                            key: key_guard,
                        };
                        match entry.lookup(&probe) {
                            Some(target) => Some((object, target)),
                            None => match resolve_set(self.shapes(), &object, key, key_guard) {
                                Some(resolution) => {
                                    let target = resolution.target.clone();
                                    self.linker(unit.id).install(entry, resolution);
                                    Some((object, target))
                                }
                                None => {
                                    entry.note_generic();
                                    None
                                }
                            },
                        }
                    }
                    None => {
                        entry.note_generic();
                        None
                    }
                },
                _ => None,
            }
        };
        let Some((object, target)) = cached else {
            return self.put_value(receiver, key, value, strict);
        };
        match target {
            Target::OwnWrite(slot) => {
                object.borrow_mut().write_slot(slot, value);
                Ok(())
            }
            Target::TransitionAdd { shape, slot } => {
                let applied = object.borrow_mut().apply_transition(shape, slot, value.clone());
                if applied {
                    Ok(())
                } else {
                    self.put_value(receiver, key, value, strict)
                }
            }
            Target::Setter { holder, slot } => {
                let holder = holder.unwrap_or_else(|| object.clone());
                match accessor_at(&holder, slot) {
                    Some((_, setter)) => self.invoke_setter(setter, receiver, key, value, strict),
                    None => self.put_value(receiver, key, value, strict),
                }
            }
            _ => self.put_value(receiver, key, value, strict),
        }
    }

    /// Record `callee` at `site` and return the cached target, if any.
    fn link_callee(&self, unit: &UnitCode, site: SiteId, callee: &Value) -> Option<CallTarget> {
        let mut sites = unit.sites.borrow_mut();
        let entry = sites.get_mut(site.0 as usize)?;
        if !entry.enter() {
            return None;
        }
        let Value::Object(function) = callee else {
            entry.note_generic();
            return None;
        };
        let probe = Probe::Callee {
            access: Access::Call,
            id: function.id(),
        };
        let target = match entry.lookup(&probe) {
            Some(target) => target,
            None => match resolve_call(function, Access::Call) {
                Some(resolution) => {
                    let target = resolution.target.clone();
                    self.linker(unit.id).install(entry, resolution);
                    target
                }
                None => {
                    entry.note_generic();
                    return None;
                }
            },
        };
        match target {
            Target::Callee(target) => Some(target),
            _ => None,
        }
    }

    pub(super) fn call_at_site(
        &mut self,
        unit: &UnitCode,
        site: SiteId,
        callee: &Value,
        this: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        let Some(target) = self.link_callee(unit, site, callee) else {
            return self.call(callee, this, args);
        };
        let Value::Object(function) = callee else {
            return self.call(callee, this, args);
        };
        let kind = match &function.borrow().kind {
            ObjectKind::Function(kind) => Some(kind.clone()),
            _ => None,
        };
        match (target, kind) {
            (CallTarget::Script(id), Some(FunctionKind::Script(closure))) if closure.function == id => {
                self.call_closure(function, &closure, this, args)
            }
            (CallTarget::Native(_), Some(FunctionKind::Native(native))) => self.call_native(&native, &this, args, false),
            _ => self.call(callee, this, args),
        }
    }

    pub(super) fn construct_at_site(
        &mut self,
        unit: &UnitCode,
        site: SiteId,
        callee: &Value,
        args: &[Value],
    ) -> VmResult<Value> {
        self.link_callee(unit, site, callee);
        self.construct(callee, args)
    }
}
