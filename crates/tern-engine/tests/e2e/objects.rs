//! Object model: properties, prototypes, accessors, attributes and arrays.

use super::harness::*;
use tern_engine::ErrorKind;

// ============================================================================
// Property Lookup
// ============================================================================

#[test]
fn test_own_property_shadows_prototype() {
    expect_i32(
        "var proto = { v: 1 }; var o = Object.create(proto); o.v = 2;
         o.v * 10 + proto.v;",
        21,
    );
}

#[test]
fn test_lookup_walks_chain_in_order() {
    expect_string(
        "var a = { name: 'a' }; var b = Object.create(a); var c = Object.create(b);
         var first = c.name; b.name = 'b'; first + c.name;",
        "ab",
    );
}

#[test]
fn test_missing_property_is_undefined() {
    expect_undefined("var o = {}; o.nothing;");
}

#[test]
fn test_property_on_null_is_type_error() {
    expect_runtime_error("var n = null; n.x;", ErrorKind::TypeError, "Cannot read");
    expect_runtime_error("var u; u.x = 1;", ErrorKind::TypeError, "Cannot set");
}

#[test]
fn test_computed_keys_are_converted_to_strings() {
    expect_i32("var o = {}; o[1] = 5; o['1'];", 5);
    expect_i32("var o = {}; var k = { toString: function () { return 'kk'; } }; o[k] = 3; o.kk;", 3);
}

#[test]
fn test_primitive_receivers_reach_prototypes() {
    expect_i32("'hello'.length;", 5);
    expect_string("'abc'.charAt(1);", "b");
    expect_string("var n = 5; n.toString();", "5");
    expect_string("true.toString();", "true");
}

// ============================================================================
// Prototypes
// ============================================================================

#[test]
fn test_set_prototype_of_replaces_chain() {
    expect_i32(
        "var p = { v: 3 }; var o = {}; Object.setPrototypeOf(o, p);
         Object.getPrototypeOf(o) === p ? o.v : -1;",
        3,
    );
}

#[test]
fn test_proto_accessor_round_trips() {
    expect_bool("var p = {}; var o = {}; o.__proto__ = p; o.__proto__ === p;", true);
    expect_bool("var o = {}; o.__proto__ = 5; Object.getPrototypeOf(o) === Object.prototype;", true);
}

#[test]
fn test_null_prototype() {
    expect_bool(
        "var o = Object.create(null); Object.getPrototypeOf(o) === null && o.toString === undefined;",
        true,
    );
}

#[test]
fn test_prototype_change_is_seen_by_cached_sites() {
    expect_string(
        "var a = { who: 'a' }; var b = { who: 'b' }; var o = Object.create(a);
         function who(x) { return x.who; }
         var out = who(o) + who(o);
         Object.setPrototypeOf(o, b);
         out + who(o);",
        "aab",
    );
}

#[test]
fn test_prototype_edit_is_seen_by_cached_sites() {
    expect_string(
        "var proto = { who: 'old' }; var o = Object.create(proto);
         function who(x) { return x.who; }
         var out = who(o) + who(o);
         proto.who = 'new';
         out + who(o);",
        "oldoldnew",
    );
}

#[test]
fn test_set_prototype_on_non_extensible_fails() {
    expect_runtime_error(
        "var o = {}; Object.preventExtensions(o); Object.setPrototypeOf(o, {});",
        ErrorKind::TypeError,
        "not extensible",
    );
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn test_literal_getter_and_setter() {
    expect_i32(
        "var o = { _v: 1, get v() { return this._v * 10; }, set v(x) { this._v = x; } };
         o.v = 4; o.v;",
        40,
    );
}

#[test]
fn test_inherited_setter_receives_receiver() {
    expect_bool(
        "var seen; var proto = { set x(v) { seen = this; } };
         var o = Object.create(proto); o.x = 1;
         seen === o && !o.hasOwnProperty('x');",
        true,
    );
}

#[test]
fn test_getter_without_setter_ignores_sloppy_write() {
    expect_i32("var o = { get v() { return 1; } }; o.v = 5; o.v;", 1);
}

#[test]
fn test_getter_without_setter_throws_in_strict_code() {
    expect_runtime_error(
        "'use strict'; var o = { get v() { return 1; } }; o.v = 5;",
        ErrorKind::TypeError,
        "v",
    );
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_define_property_defaults_are_false() {
    expect_string(
        "var o = {}; Object.defineProperty(o, 'x', { value: 1 });
         var d = Object.getOwnPropertyDescriptor(o, 'x');
         '' + d.value + d.writable + d.enumerable + d.configurable;",
        "1falsefalsefalse",
    );
}

#[test]
fn test_read_only_write_is_ignored_in_sloppy_code() {
    expect_i32("var o = {}; Object.defineProperty(o, 'x', { value: 1 }); o.x = 2; o.x;", 1);
}

#[test]
fn test_read_only_write_throws_in_strict_code() {
    expect_runtime_error(
        "'use strict'; var o = {}; Object.defineProperty(o, 'x', { value: 1 }); o.x = 2;",
        ErrorKind::TypeError,
        "read only",
    );
}

#[test]
fn test_redefining_non_configurable_throws() {
    expect_runtime_error(
        "var o = {}; Object.defineProperty(o, 'x', { value: 1 });
         Object.defineProperty(o, 'x', { value: 2 });",
        ErrorKind::TypeError,
        "Cannot redefine property: x",
    );
}

#[test]
fn test_non_enumerable_properties_are_skipped_by_keys() {
    expect_string(
        "var o = { a: 1 }; Object.defineProperty(o, 'hidden', { value: 2, enumerable: false }); o.b = 3;
         Object.keys(o).join(',') + '|' + Object.getOwnPropertyNames(o).join(',');",
        "a,b|a,hidden,b",
    );
}

#[test]
fn test_prevent_extensions() {
    expect_bool(
        "var o = { a: 1 }; Object.preventExtensions(o); o.b = 2;
         !Object.isExtensible(o) && o.b === undefined && o.a === 1;",
        true,
    );
    expect_runtime_error(
        "'use strict'; var o = {}; Object.preventExtensions(o); o.b = 2;",
        ErrorKind::TypeError,
        "not extensible",
    );
}

#[test]
fn test_delete_non_configurable() {
    expect_bool("var o = {}; Object.defineProperty(o, 'x', { value: 1 }); delete o.x;", false);
    expect_runtime_error(
        "'use strict'; var o = {}; Object.defineProperty(o, 'x', { value: 1 }); delete o.x;",
        ErrorKind::TypeError,
        "x",
    );
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn test_for_in_visits_own_then_inherited() {
    expect_string(
        "var p = { inherited: 1 }; var o = Object.create(p); o.own = 2; o.other = 3;
         var keys = [];
         for (var k in o) keys.push(k);
         keys.join(',');",
        "own,other,inherited",
    );
}

#[test]
fn test_for_in_skips_deleted_keys() {
    expect_string(
        "var o = { a: 1, b: 2, c: 3 }; var keys = '';
         for (var k in o) { keys += k; delete o.c; }
         keys;",
        "ab",
    );
}

#[test]
fn test_for_in_over_array_indices() {
    expect_string("var a = [5, 6, 7]; var s = ''; for (var i in a) s += i; s;", "012");
}

#[test]
fn test_for_in_over_null_does_nothing() {
    expect_i32("var n = 0; for (var k in null) n++; n;", 0);
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_array_length_tracks_writes() {
    expect_i32("var a = []; a[4] = 1; a.length;", 5);
    expect_i32("var a = [1, 2, 3]; a.length = 1; a.length;", 1);
    expect_undefined("var a = [1, 2, 3]; a.length = 1; a[2];");
}

#[test]
fn test_array_holes_read_undefined() {
    expect_string("var a = [1, , 3]; typeof a[1] + a.length;", "undefined3");
}

#[test]
fn test_array_holes_are_absent() {
    expect_bool("var a = [1, , 3]; 1 in a;", false);
    expect_bool("var a = [1, 2, 3]; delete a[1]; 1 in a;", false);
    expect_bool("var a = [1, 2, 3]; delete a[1]; a.hasOwnProperty(1);", false);
    expect_string("var a = [1, 2, 3]; delete a[1]; a.length + ':' + a.join('-');", "3:1--3");
}

#[test]
fn test_holes_are_skipped_by_enumeration() {
    expect_string("Object.keys([1, , 3]).join(',');", "0,2");
    expect_string("var a = ['a', 'b', 'c']; delete a[0]; var s = ''; for (var k in a) s += k; s;", "12");
    expect_string("var a = [, , ]; a[1] = 'x'; Object.keys(a).join(',') + '|' + a.length;", "1|2");
}

#[test]
fn test_hole_inherits_from_prototype() {
    expect_string("Array.prototype[1] = 'p'; var a = [0, , 2]; var r = a[1]; delete Array.prototype[1]; r;", "p");
}

#[test]
fn test_sparse_array_write() {
    expect_i32("var a = []; a[1000000] = 1; a.length;", 1_000_001);
}

#[test]
fn test_invalid_array_length() {
    expect_runtime_error("var a = []; a.length = -1;", ErrorKind::RangeError, "Invalid array length");
}

// ============================================================================
// with
// ============================================================================

#[test]
fn test_with_resolves_object_properties() {
    expect_i32("var o = { x: 5 }; var x = 1; with (o) { x = x + 1; } o.x * 10 + x;", 61);
}

#[test]
fn test_with_falls_back_to_outer_scope() {
    expect_i32("function f() { var y = 2; with ({}) { y = 3; } return y; } f();", 3);
}

#[test]
fn test_with_is_syntax_error_in_strict_code() {
    expect_compile_error("'use strict'; with ({}) {}", "SyntaxError");
}
