//! The built-in library: Object, Function, Array, String, Number, Boolean,
//! the error constructors and the global functions.

use super::harness::*;
use tern_engine::ErrorKind;

// ============================================================================
// Object
// ============================================================================

#[test]
fn test_object_create_with_properties() {
    expect_string(
        "var o = Object.create({ inherited: 1 }, { own: { value: 'v', enumerable: true } });
         o.own + Object.keys(o).length + o.inherited;",
        "v11",
    );
}

#[test]
fn test_object_create_rejects_primitive_prototype() {
    expect_runtime_error("Object.create(1);", ErrorKind::TypeError, "Object prototype may only be an Object or null");
}

#[test]
fn test_define_properties() {
    expect_i32(
        "var o = {}; Object.defineProperties(o, { a: { value: 1 }, b: { get: function () { return 2; } } });
         o.a + o.b;",
        3,
    );
}

#[test]
fn test_accessor_descriptor_round_trip() {
    expect_string(
        "var g = function () { return 1; };
         var o = {}; Object.defineProperty(o, 'x', { get: g, configurable: true });
         var d = Object.getOwnPropertyDescriptor(o, 'x');
         '' + (d.get === g) + d.set + d.configurable + ('value' in d);",
        "trueundefinedtruefalse",
    );
}

#[test]
fn test_get_own_property_descriptor_of_missing_key() {
    expect_undefined("Object.getOwnPropertyDescriptor({}, 'nope');");
}

#[test]
fn test_define_property_requires_object_target() {
    expect_runtime_error("Object.defineProperty(1, 'x', {});", ErrorKind::TypeError, "Object.defineProperty");
}

#[test]
fn test_has_own_property_and_enumerable() {
    expect_string(
        "var o = Object.create({ p: 1 }); o.q = 2;
         '' + o.hasOwnProperty('p') + o.hasOwnProperty('q') + o.propertyIsEnumerable('q');",
        "falsetruetrue",
    );
}

#[test]
fn test_is_prototype_of() {
    expect_bool("var p = {}; var o = Object.create(Object.create(p)); p.isPrototypeOf(o);", true);
    expect_bool("Object.prototype.isPrototypeOf(1);", false);
}

#[test]
fn test_object_to_string_tags() {
    expect_string("Object.prototype.toString.call([]);", "[object Array]");
    expect_string("Object.prototype.toString.call(function () {});", "[object Function]");
    expect_string("Object.prototype.toString.call(new Error());", "[object Error]");
    expect_string("Object.prototype.toString.call(null);", "[object Null]");
    expect_string("Object.prototype.toString.call(undefined);", "[object Undefined]");
}

#[test]
fn test_object_constructor_wraps_primitives() {
    expect_string("typeof Object(1);", "object");
    expect_bool("var o = {}; Object(o) === o;", true);
    expect_i32("Object(5).valueOf() + 1;", 6);
}

// ============================================================================
// Array
// ============================================================================

#[test]
fn test_array_constructor() {
    expect_i32("new Array(3).length;", 3);
    expect_string("Array(1, 2, 3).join('-');", "1-2-3");
    expect_string("new Array('3').join();", "3");
}

#[test]
fn test_array_constructor_rejects_bad_length() {
    expect_runtime_error("new Array(-1);", ErrorKind::RangeError, "Invalid array length");
    expect_runtime_error("Array(1.5);", ErrorKind::RangeError, "Invalid array length");
}

#[test]
fn test_is_array() {
    expect_string("'' + Array.isArray([]) + Array.isArray({ length: 0 }) + Array.isArray();", "truefalsefalse");
}

#[test]
fn test_push_returns_new_length() {
    expect_string("var a = [1]; var n = a.push(2, 3); n + ':' + a.join();", "3:1,2,3");
}

#[test]
fn test_push_is_generic() {
    expect_string(
        "var o = { length: 1, 0: 'a' }; Array.prototype.push.call(o, 'b'); o.length + o[1];",
        "2b",
    );
}

#[test]
fn test_join_renders_nullish_as_empty() {
    expect_string("[1, null, undefined, 'x'].join('|');", "1|||x");
    expect_string("String([1, [2, 3]]);", "1,2,3");
}

// ============================================================================
// String, Number, Boolean
// ============================================================================

#[test]
fn test_string_conversion_function() {
    expect_string("String(12) + String(null) + String(true);", "12nulltrue");
    expect_string("String();", "");
}

#[test]
fn test_string_wrapper_object() {
    expect_string("var s = new String('ab'); typeof s + s.length + s[1];", "object2b");
    expect_bool("new String('a') == 'a';", true);
}

#[test]
fn test_char_at() {
    expect_string("'hello'.charAt(4);", "o");
    expect_string("'hello'.charAt(10);", "");
    expect_string("'hello'.charAt(-1);", "");
    expect_string("'hello'.charAt();", "h");
}

#[test]
fn test_string_value_of_rejects_non_strings() {
    expect_runtime_error("String.prototype.valueOf.call(1);", ErrorKind::TypeError, "String");
}

#[test]
fn test_number_and_boolean() {
    expect_i32("Number('42') + Number();", 42);
    expect_string("typeof new Number(1) + typeof Number(1);", "objectnumber");
    expect_string("Boolean('') + ',' + Boolean('0');", "false,true");
    expect_bool("new Boolean(false).valueOf();", false);
    expect_string("(255).toString() + true.toString();", "255true");
}

// ============================================================================
// Error Constructors
// ============================================================================

#[test]
fn test_error_constructors_chain_to_error() {
    expect_bool(
        "var all = [new TypeError(), new RangeError(), new ReferenceError(), new SyntaxError()];
         var ok = true;
         for (var i = 0; i < all.length; i++) { ok = ok && all[i] instanceof Error; }
         ok;",
        true,
    );
}

#[test]
fn test_error_prototype_fields() {
    expect_string("TypeError.prototype.name + '|' + Error.prototype.message + '|';", "TypeError||");
    expect_bool("new Error().hasOwnProperty('message');", false);
}

// ============================================================================
// Globals
// ============================================================================

#[test]
fn test_global_constants_are_read_only() {
    expect_string("undefined = 1; NaN = 2; typeof undefined + isNaN(NaN);", "undefinedtrue");
}

#[test]
fn test_is_nan_and_is_finite() {
    expect_string(
        "'' + isNaN('abc') + isNaN('12') + isFinite(Infinity) + isFinite('3');",
        "truefalsefalsetrue",
    );
}

#[test]
fn test_eval_runs_in_global_scope() {
    expect_i32("var g = 1; eval('g + 1');", 2);
    expect_string(
        "var x = 'global'; function f() { var x = 'local'; return eval('x'); } f();",
        "global",
    );
}

#[test]
fn test_eval_declares_globals() {
    expect_i32("eval('var fromEval = 7;'); fromEval;", 7);
}

#[test]
fn test_eval_of_non_string_returns_argument() {
    expect_i32("eval(5);", 5);
    expect_bool("var o = {}; eval(o) === o;", true);
}

#[test]
fn test_eval_syntax_error_is_catchable() {
    expect_bool(
        "var ok = false; try { eval('1 +'); } catch (e) { ok = e instanceof SyntaxError; } ok;",
        true,
    );
}

#[test]
fn test_regexp_literal_to_string() {
    expect_string("String(/a+b/gi);", "/a+b/gi");
}
