//! Conversion tables: ToNumber, ToString, ToInt32/ToUint32, typeof and
//! loose equality.

use super::harness::*;

// ============================================================================
// ToNumber of strings
// ============================================================================

#[test]
fn test_to_number_of_strings() {
    let cases: &[(&str, f64)] = &[
        ("''", 0.0),
        ("'   '", 0.0),
        ("' 42 '", 42.0),
        ("'0x1F'", 31.0),
        ("'1e3'", 1000.0),
        ("'.5'", 0.5),
        ("'-Infinity'", f64::NEG_INFINITY),
        ("'\\n12\\t'", 12.0),
    ];
    for (literal, expected) in cases {
        expect_f64(&format!("+{};", literal), *expected);
    }
}

#[test]
fn test_to_number_of_malformed_strings_is_nan() {
    for literal in ["'12px'", "'0x'", "'1e'", "'infinity'", "'- 1'"] {
        expect_f64(&format!("+{};", literal), f64::NAN);
    }
}

#[test]
fn test_to_number_of_other_types() {
    expect_f64("+true;", 1.0);
    expect_f64("+false;", 0.0);
    expect_f64("+null;", 0.0);
    expect_f64("+undefined;", f64::NAN);
    expect_f64("+[];", 0.0);
    expect_f64("+[7];", 7.0);
    expect_f64("+{};", f64::NAN);
}

// ============================================================================
// Number ToString
// ============================================================================

#[test]
fn test_number_to_string() {
    let cases: &[(&str, &str)] = &[
        ("1", "1"),
        ("-0", "0"),
        ("1.5", "1.5"),
        ("0.1 + 0.2", "0.30000000000000004"),
        ("1e21", "1e+21"),
        ("123456789012345680000", "123456789012345680000"),
        ("1e-7", "1e-7"),
        ("0.000001", "0.000001"),
        ("1 / 0", "Infinity"),
        ("-1 / 0", "-Infinity"),
        ("0 / 0", "NaN"),
    ];
    for (expr, expected) in cases {
        expect_string(&format!("'' + ({});", expr), expected);
    }
}

// ============================================================================
// ToInt32 / ToUint32
// ============================================================================

#[test]
fn test_to_int32_wraps() {
    expect_i32("4294967296 | 0;", 0);
    expect_i32("2147483648 | 0;", i32::MIN);
    expect_i32("4294967295 | 0;", -1);
    expect_i32("-2147483649 | 0;", i32::MAX);
    expect_i32("3.9 | 0;", 3);
    expect_i32("-3.9 | 0;", -3);
    expect_i32("NaN | 0;", 0);
    expect_i32("Infinity | 0;", 0);
}

#[test]
fn test_to_uint32_wraps() {
    expect_f64("-1 >>> 0;", 4294967295.0);
    expect_i32("4294967296 >>> 0;", 0);
    expect_i32("1 << 32;", 1);
    expect_i32("1 << 33;", 2);
}

// ============================================================================
// typeof
// ============================================================================

#[test]
fn test_typeof_table() {
    let cases: &[(&str, &str)] = &[
        ("undefined", "undefined"),
        ("null", "object"),
        ("true", "boolean"),
        ("1", "number"),
        ("1.5", "number"),
        ("'s'", "string"),
        ("{}", "object"),
        ("[]", "object"),
        ("function () {}", "function"),
        ("Object", "function"),
        ("/re/", "object"),
    ];
    for (expr, expected) in cases {
        expect_string(&format!("typeof ({});", expr), expected);
    }
}

#[test]
fn test_typeof_undeclared_is_undefined() {
    expect_string("typeof notDeclaredAnywhere;", "undefined");
}

// ============================================================================
// Loose equality
// ============================================================================

#[test]
fn test_loose_equality_table() {
    let cases: &[(&str, bool)] = &[
        ("null == undefined", true),
        ("null == 0", false),
        ("undefined == 0", false),
        ("'1' == 1", true),
        ("'' == 0", true),
        ("true == 1", true),
        ("'true' == true", false),
        ("[1] == 1", true),
        ("[1,2] == '1,2'", true),
        ("({}) == '[object Object]'", true),
        ("NaN == NaN", false),
    ];
    for (expr, expected) in cases {
        expect_bool(&format!("{};", expr), *expected);
    }
}

#[test]
fn test_truthiness() {
    expect_string(
        "var values = [0, -0, NaN, '', null, undefined, false, '0', 'false', [], {}];
         var out = '';
         for (var i = 0; i < values.length; i++) { out += values[i] ? 'T' : 'F'; }
         out;",
        "FFFFFFFTTTT",
    );
}
