//! Host objects: embedder-provided capabilities seen from scripts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::harness::*;
use tern_engine::{ErrorKind, HostError, HostObject, SiteState, Value};

/// A property bag that records every write.
#[derive(Default)]
struct Settings {
    values: RefCell<HashMap<String, Value>>,
    writes: RefCell<Vec<String>>,
}

impl HostObject for Settings {
    fn class_name(&self) -> &str {
        "Settings"
    }

    fn has_property(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    fn get_property(&self, key: &str) -> Result<Value, HostError> {
        Ok(self.values.borrow().get(key).cloned().unwrap_or_default())
    }

    fn set_property(&self, key: &str, value: Value) -> Result<(), HostError> {
        if key == "locked" {
            return Err(HostError::Failed("locked is read only".to_string()));
        }
        self.writes.borrow_mut().push(key.to_string());
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

/// A callable host that sums its numeric arguments.
struct Adder;

impl HostObject for Adder {
    fn class_name(&self) -> &str {
        "Adder"
    }

    fn is_callable(&self) -> bool {
        true
    }

    fn invoke(&self, _this: &Value, args: &[Value]) -> Result<Value, HostError> {
        let mut total = 0.0;
        for arg in args {
            total += arg
                .as_number()
                .ok_or_else(|| HostError::Failed(format!("cannot add {}", arg)))?;
        }
        Ok(Value::number(total))
    }
}

/// Implements nothing.
struct Opaque;

impl HostObject for Opaque {}

fn session_with_settings() -> (Session, Rc<Settings>) {
    let session = Session::new();
    let settings = Rc::new(Settings::default());
    settings.values.borrow_mut().insert("level".to_string(), Value::Int(3));
    session.context.define_host_object("settings", settings.clone());
    (session, settings)
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_script_reads_host_property() {
    let (mut session, _) = session_with_settings();
    assert_eq!(session.eval("settings.level * 2;"), Value::Int(6));
}

#[test]
fn test_script_writes_reach_host() {
    let (mut session, settings) = session_with_settings();
    session.eval("settings.mode = 'fast'; settings.level = settings.level + 1;");
    assert_eq!(settings.values.borrow().get("mode"), Some(&Value::from("fast")));
    assert_eq!(settings.values.borrow().get("level"), Some(&Value::Int(4)));
    assert_eq!(*settings.writes.borrow(), vec!["mode".to_string(), "level".to_string()]);
}

#[test]
fn test_unknown_host_key_falls_through_to_prototype() {
    let (mut session, _) = session_with_settings();
    assert_eq!(session.eval("typeof settings.hasOwnProperty;"), Value::from("function"));
    assert!(session.eval("settings.missing;").is_undefined());
}

#[test]
fn test_host_failure_is_type_error() {
    let (mut session, _) = session_with_settings();
    let unit = session.compile("settings.locked = true;");
    let err = session.run(&unit).expect_err("write should fail");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "locked is read only");
}

#[test]
fn test_host_failure_is_catchable() {
    let (mut session, _) = session_with_settings();
    assert_eq!(
        session.eval("var m; try { settings.locked = 1; } catch (e) { m = e.message; } m;"),
        Value::from("locked is read only")
    );
}

#[test]
fn test_host_class_name_in_to_string() {
    let (mut session, _) = session_with_settings();
    assert_eq!(
        session.eval("Object.prototype.toString.call(settings);"),
        Value::from("[object Settings]")
    );
}

#[test]
fn test_host_accesses_stay_generic() {
    let (mut session, _) = session_with_settings();
    let unit = session.compile("var n = 0; for (var i = 0; i < 10; i++) { n += settings.level; } n;");
    assert_eq!(session.run(&unit).expect("run"), Value::Int(30));
    let site = unit.find_site("property .level").expect("level site");
    assert_eq!(site.state, SiteState::Unlinked);
    assert_eq!(site.stats.resolutions, 0);
    assert_eq!(site.stats.generic, 10);
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_callable_host() {
    let mut session = Session::new();
    session.context.define_host_object("add", Rc::new(Adder));
    assert_eq!(session.eval("add(1, 2, 3.5);"), Value::Number(6.5));
    assert_eq!(session.eval("typeof add;"), Value::from("function"));
}

#[test]
fn test_callable_host_error() {
    let mut session = Session::new();
    session.context.define_host_object("add", Rc::new(Adder));
    let unit = session.compile("add(1, 'two');");
    let err = session.run(&unit).expect_err("bad argument");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert!(err.message.contains("cannot add two"));
}

// ============================================================================
// Missing Capabilities
// ============================================================================

#[test]
fn test_missing_capabilities_are_type_errors() {
    let mut session = Session::new();
    session.context.define_host_object("opaque", Rc::new(Opaque));
    assert!(session.eval("opaque.anything;").is_undefined());
    for source in ["opaque.x = 1;", "opaque();"] {
        let unit = session.compile(source);
        let err = session.run(&unit).expect_err("capability is missing");
        assert_eq!(err.kind, ErrorKind::TypeError, "for {}", source);
    }
    assert_eq!(
        session.eval("Object.prototype.toString.call(opaque);"),
        Value::from("[object HostObject]")
    );
}

#[test]
fn test_host_objects_reject_define_property() {
    let mut session = Session::new();
    session.context.define_host_object("opaque", Rc::new(Opaque));
    let unit = session.compile("Object.defineProperty(opaque, 'x', { value: 1 });");
    let err = session.run(&unit).expect_err("define should fail");
    assert_eq!(err.kind, ErrorKind::TypeError);
}
