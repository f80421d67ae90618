//! Arithmetic, comparison and logical operators, plus evaluation order.

use super::harness::*;

// ============================================================================
// Integer Arithmetic
// ============================================================================

#[test]
fn test_integer_add() {
    expect_i32("10 + 5;", 15);
}

#[test]
fn test_integer_complex_expression() {
    expect_i32("2 + 3 * 4;", 14);
}

#[test]
fn test_integer_parentheses_precedence() {
    expect_i32("(2 + 3) * 4;", 20);
}

#[test]
fn test_division_is_not_truncating() {
    expect_f64("10 / 4;", 2.5);
}

#[test]
fn test_modulo_keeps_sign_of_dividend() {
    expect_i32("-7 % 3;", -1);
}

#[test]
fn test_overflow_widens_instead_of_wrapping() {
    expect_f64("var x = 2147483647; x + 1;", 2147483648.0);
    expect_f64("var y = -2147483648; y - 1;", -2147483649.0);
    expect_f64("65536 * 65536;", 4294967296.0);
}

#[test]
fn test_negative_zero_survives() {
    expect_f64("1 / (0 * -1);", f64::NEG_INFINITY);
    expect_f64("var z = 0; 1 / -z;", f64::NEG_INFINITY);
}

#[test]
fn test_division_by_zero() {
    expect_f64("1 / 0;", f64::INFINITY);
    expect_f64("0 / 0;", f64::NAN);
}

// ============================================================================
// Bitwise
// ============================================================================

#[test]
fn test_bitwise_operators() {
    expect_i32("5 & 3;", 1);
    expect_i32("5 | 3;", 7);
    expect_i32("5 ^ 3;", 6);
    expect_i32("~5;", -6);
    expect_i32("1 << 31;", i32::MIN);
    expect_i32("-16 >> 2;", -4);
    expect_f64("-1 >>> 0;", 4294967295.0);
}

// ============================================================================
// String Concatenation
// ============================================================================

#[test]
fn test_plus_with_string_concatenates() {
    expect_string("'a' + 1;", "a1");
    expect_string("1 + 2 + 'x';", "3x");
    expect_string("'x' + 1 + 2;", "x12");
    expect_string("'' + null + undefined + true;", "nullundefinedtrue");
}

#[test]
fn test_plus_uses_value_of() {
    expect_i32("var o = { valueOf: function () { return 41; } }; o + 1;", 42);
    expect_string("var o = { toString: function () { return 'o'; } }; o + '!';", "o!");
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_nan_comparisons_are_false() {
    expect_bool("NaN < 1 || NaN > 1 || NaN <= 1 || NaN >= 1 || NaN == NaN;", false);
    expect_bool("NaN != NaN;", true);
}

#[test]
fn test_string_comparison_is_lexicographic() {
    expect_bool("'b' > 'a';", true);
    expect_bool("'10' < '9';", true);
    expect_bool("'10' < 9;", false);
}

#[test]
fn test_strict_equality() {
    expect_bool("1 === 1.0;", true);
    expect_bool("'1' === 1;", false);
    expect_bool("null === undefined;", false);
    expect_bool("var o = {}; o === o;", true);
    expect_bool("({}) === ({});", false);
}

// ============================================================================
// Logical Operators
// ============================================================================

#[test]
fn test_logical_operators_return_operands() {
    expect_i32("0 || 7;", 7);
    expect_string("'a' && 'b';", "b");
    expect_null("null && f();");
}

#[test]
fn test_short_circuit_skips_right_side() {
    expect_i32(
        "var calls = 0; function hit() { calls++; return true; }
         false && hit(); true || hit(); null && hit();
         calls;",
        0,
    );
}

#[test]
fn test_conditional_operator() {
    expect_string("var n = 3; n > 2 ? 'big' : 'small';", "big");
}

// ============================================================================
// Evaluation Order
// ============================================================================

#[test]
fn test_operands_evaluate_left_to_right() {
    expect_string(
        "var log = '';
         function t(x) { log += x; return x; }
         t('a') + t('b') * t('c');
         log;",
        "abc",
    );
}

#[test]
fn test_call_arguments_evaluate_left_to_right() {
    expect_string(
        "var log = '';
         function t(x) { log += x; return x; }
         function f() {}
         f(t(1), t(2), t(3));
         log;",
        "123",
    );
}

#[test]
fn test_assignment_target_evaluates_before_value() {
    expect_string(
        "var log = '';
         var o = {};
         function obj() { log += 'o'; return o; }
         function key() { log += 'k'; return 'p'; }
         function val() { log += 'v'; return 1; }
         obj()[key()] = val();
         log;",
        "okv",
    );
}

#[test]
fn test_compound_assignment_reads_once() {
    expect_string(
        "var log = '';
         var o = { n: 1 };
         function obj() { log += 'o'; return o; }
         obj().n += 5;
         log + o.n;",
        "o6",
    );
}

#[test]
fn test_computed_key_converts_before_value() {
    expect_string(
        "var log = '';
         var o = {};
         var k = { toString: function () { log += 'k'; return 'p'; } };
         o[k] = (log += 'v', 1);
         log + o.p;",
        "kv1",
    );
}

#[test]
fn test_computed_key_converts_once_for_read_modify_write() {
    expect_string(
        "var calls = 0;
         var o = { p: 1 };
         var k = { toString: function () { calls++; return 'p'; } };
         o[k] += 1;
         var first = calls;
         o[k]++;
         first + ',' + calls + ',' + o.p;",
        "1,2,3",
    );
}

#[test]
fn test_null_base_throws_before_value() {
    expect_string(
        "var ran = false, kind;
         var n = null;
         try { n['x'] = (ran = true); } catch (e) { kind = e.name; }
         kind + ' ' + ran;",
        "TypeError false",
    );
}

// ============================================================================
// Update and Unary
// ============================================================================

#[test]
fn test_prefix_and_postfix_update() {
    expect_string("var i = 5; var a = i++; var b = ++i; a + ',' + b + ',' + i;", "5,7,7");
    expect_string("var s = '5'; s++; typeof s + s;", "number6");
}

#[test]
fn test_void_and_delete() {
    expect_undefined("void 42;");
    expect_bool("var o = { a: 1 }; delete o.a && !('a' in o);", true);
}

#[test]
fn test_in_and_instanceof() {
    expect_bool("'length' in [];", true);
    expect_bool("function F() {} new F() instanceof F;", true);
    expect_bool("[] instanceof Object;", true);
}
