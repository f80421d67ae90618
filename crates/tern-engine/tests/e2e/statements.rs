//! Statements and control flow: loops, labels, switch, block scoping,
//! templates and the script completion value.

use super::harness::*;

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_while_and_do_while() {
    expect_i32("var i = 0; while (i < 10) i++; i;", 10);
    expect_i32("var n = 0; do { n++; } while (false); n;", 1);
}

#[test]
fn test_for_with_continue() {
    expect_i32(
        "var s = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; s += i; } s;",
        20,
    );
}

#[test]
fn test_labeled_break_and_continue() {
    expect_string(
        "var out = '';
         outer: for (var i = 0; i < 3; i++) {
           for (var j = 0; j < 3; j++) {
             if (j === 1) continue outer;
             if (i === 2) break outer;
             out += i + '' + j + ' ';
           }
         }
         out;",
        "00 10 ",
    );
}

#[test]
fn test_labeled_block_break() {
    expect_i32("var x = 0; done: { x = 1; break done; x = 2; } x;", 1);
}

// ============================================================================
// switch
// ============================================================================

#[test]
fn test_switch_falls_through() {
    expect_string(
        "function name(n) {
           var s = '';
           switch (n) {
             case 1: s += 'one';
             case 2: s += 'two'; break;
             case 3: s += 'three'; break;
             default: s += 'other';
           }
           return s;
         }
         name(1) + '|' + name(2) + '|' + name(3) + '|' + name(9);",
        "onetwo|two|three|other",
    );
}

#[test]
fn test_switch_uses_strict_equality() {
    expect_string("var r = 'none'; switch ('1') { case 1: r = 'number'; break; case '1': r = 'string'; } r;", "string");
}

#[test]
fn test_switch_default_in_middle() {
    expect_string(
        "var s = ''; switch (5) { case 1: s += 'a'; default: s += 'd'; case 2: s += 'b'; } s;",
        "db",
    );
}

// ============================================================================
// let / const
// ============================================================================

#[test]
fn test_let_is_block_scoped() {
    expect_i32("var x = 1; { let x = 2; } x;", 1);
    expect_string("let a = 'outer'; if (true) { let a = 'inner'; } a;", "outer");
}

#[test]
fn test_let_loop_binding() {
    expect_i32("var total = 0; for (let i = 0; i < 4; i++) { total += i; } total;", 6);
}

#[test]
fn test_top_level_let_is_not_global_property() {
    expect_bool("let hidden = 1; var shown = 2; this.hidden === undefined && this.shown === 2;", true);
}

#[test]
fn test_const_binding() {
    expect_i32("const K = 7; K * 2;", 14);
}

// ============================================================================
// Templates and Literals
// ============================================================================

#[test]
fn test_template_literal_interpolates() {
    expect_string("var n = 3; `n is ${n}, double ${n * 2}`;", "n is 3, double 6");
    expect_string("`${null}-${undefined}-${[1, 2]}`;", "null-undefined-1,2");
}

#[test]
fn test_numeric_literal_forms() {
    expect_i32("0x1f + 010 + 019;", 31 + 8 + 19);
    expect_f64("1.5e2;", 150.0);
}

#[test]
fn test_string_escapes() {
    expect_string("'a\\tb\\x41\\u0042';", "a\tbAB");
    expect_i32("'\\u00e9'.length;", 1);
}

#[test]
fn test_object_literal_keys() {
    expect_string("var o = { 'quoted key': 1, 2: 'two', plain: 3 }; o['quoted key'] + o[2] + o.plain;", "1two3");
}

// ============================================================================
// Automatic Semicolon Insertion
// ============================================================================

#[test]
fn test_asi_after_newline() {
    expect_i32("var a = 1\nvar b = 2\na + b", 3);
}

#[test]
fn test_asi_in_return_is_restricted() {
    expect_undefined("function f() {\n  return\n  42;\n}\nf();");
}

#[test]
fn test_asi_before_postfix_operator() {
    expect_i32("var a = 1, b = 1;\na\n++b\nb;", 2);
}

// ============================================================================
// Completion Value
// ============================================================================

#[test]
fn test_completion_is_last_expression_statement() {
    expect_i32("1; 2; var x = 5;", 2);
    expect_undefined("var x = 5;");
}

#[test]
fn test_completion_from_loop_body() {
    expect_i32("for (var i = 0; i < 3; i++) { i * 10; }", 20);
}

#[test]
fn test_debugger_statement_is_a_no_op() {
    expect_i32("debugger; 4;", 4);
}
