use num_bigint::BigInt;

use super::{print, Interpreter, Value};
use crate::analyzer::Analyzer;
use crate::error::{ErrorKind, Result};
use crate::parser::{parse, tokenize_string};

/// Runs `input` without static analysis, returning the result and everything printed.
fn run(input: &str) -> (Result<Value>, String) {
    let tokens = tokenize_string(input).unwrap();
    let source = parse(&tokens).unwrap();
    let mut out = Vec::new();
    let result = Interpreter::with_output(&mut out).evaluate(&source);
    (result, String::from_utf8(out).unwrap())
}

fn assert_result(input: &str, expected: Value) {
    match run(input) {
        (Ok(value), _) => assert_eq!(value, expected, "\nWrong result for \"{input}\"\n"),
        (Err(err), _) => panic!("\nFailed to run \"{input}\":\n{err}\n"),
    }
}

fn assert_output(input: &str, expected: &str) {
    match run(input) {
        (Ok(_), output) => assert_eq!(output, expected, "\nWrong output for \"{input}\"\n"),
        (Err(err), _) => panic!("\nFailed to run \"{input}\":\n{err}\n"),
    }
}

fn assert_raises_error(input: &str, kind: ErrorKind) {
    match run(input) {
        (Ok(value), _) => panic!("\nExpected {kind} for \"{input}\", got {value}\n"),
        (Err(err), _) => assert_eq!(err.kind(), kind, "\nWrong error for \"{input}\": {err}\n"),
    }
}

fn int(value: i64) -> Value {
    Value::Integer(BigInt::from(value))
}

#[test]
fn test_main_result() {
    assert_result("FUN main() DO RETURN 1 + 2; END", int(3));
    assert_result("FUN main() DO END", Value::Nil);
    assert_result("FUN main() DO RETURN \"1\" + \"1\"; END", Value::String("11".into()));
    assert_result("FUN main() DO RETURN 2 ^ 3 * 2; END", int(16));
    assert_result("FUN main() DO RETURN 1 < 2 && 'a' == 'a'; END", Value::Boolean(true));
}

#[test]
fn test_missing_main() {
    assert_raises_error("FUN helper() DO END", ErrorKind::Name);
    assert_raises_error("FUN main(args) DO END", ErrorKind::Name);
}

#[test]
fn test_print() {
    assert_output(
        "FUN main() DO print(\"hi\"); print(1.5); print(NIL); print(TRUE); print('c'); END",
        "hi\n1.5\nNIL\nTRUE\nc\n",
    );
    assert_raises_error("FUN main() DO print(); END", ErrorKind::Name);
    assert_raises_error("FUN main() DO print(1, 2); END", ErrorKind::Name);
}

#[test]
fn test_globals() {
    assert_result("VAR x = 1; FUN main() DO x = x + 1; RETURN x; END", int(2));
    assert_result("VAR x; FUN main() DO RETURN x; END", Value::Nil);
    assert_raises_error("VAL x = 1; FUN main() DO x = 2; END", ErrorKind::Runtime);
    assert_raises_error("FUN main() DO y = 2; END", ErrorKind::Runtime);
    assert_raises_error("FUN main() DO RETURN y; END", ErrorKind::Name);
}

#[test]
fn test_functions() {
    assert_result(
        "FUN fact(n: Integer): Integer DO \
           IF n < 1 DO RETURN 1; END \
           RETURN n * fact(n - 1); \
         END \
         FUN main(): Integer DO RETURN fact(10); END",
        int(3628800),
    );
    assert_result(
        "FUN f() DO RETURN 10; END FUN f(a) DO RETURN a; END \
         FUN main() DO RETURN f() + f(5); END",
        int(15),
    );
    assert_result(
        "VAR x = 1; FUN f(x) DO RETURN x; END FUN main() DO RETURN f(7) + x; END",
        int(8),
    );
    assert_raises_error("FUN f(a) DO a = 1; END FUN main() DO f(0); END", ErrorKind::Runtime);
}

#[test]
fn test_return_unwinds() {
    assert_result("FUN main() DO WHILE TRUE DO RETURN 5; END END", int(5));
    let (result, output) = run(
        "FUN f() DO WHILE TRUE DO IF TRUE DO RETURN 1; END print(0); END END \
         FUN main() DO LET x = f(); print(x); RETURN 2; print(3); END",
    );
    assert_eq!(result.unwrap(), int(2));
    assert_eq!(output, "1\n");
}

#[test]
fn test_if() {
    assert_output(
        "FUN main() DO IF 1 < 2 DO print(\"then\"); ELSE print(\"else\"); END END",
        "then\n",
    );
    assert_output(
        "FUN main() DO IF 1 > 2 DO print(\"then\"); ELSE print(\"else\"); END END",
        "else\n",
    );
    assert_raises_error("FUN main() DO IF 1 DO print(1); END END", ErrorKind::Runtime);
}

#[test]
fn test_while() {
    assert_result(
        "FUN main() DO LET i = 0; LET sum = 0; \
           WHILE i < 5 DO sum = sum + i; i = i + 1; END \
           RETURN sum; END",
        int(10),
    );
    assert_output(
        "FUN main() DO LET i = 0; \
           WHILE i < 3 DO LET seen; print(seen); seen = i; i = i + 1; END END",
        "NIL\nNIL\nNIL\n",
    );
    assert_raises_error(
        "FUN main() DO LET i = 0; WHILE i < 1 DO LET x = 1; i = i + 1; END RETURN x; END",
        ErrorKind::Name,
    );
    assert_raises_error("FUN main() DO WHILE NIL DO END END", ErrorKind::Runtime);
}

#[test]
fn test_switch() {
    let program = |value: &str| {
        format!(
            "FUN main() DO SWITCH {value} \
               CASE 1: print(\"one\"); \
               CASE 2: print(\"two\"); \
               DEFAULT print(\"other\"); \
             END END"
        )
    };
    assert_output(&program("1"), "one\n");
    assert_output(&program("2"), "two\n");
    assert_output(&program("3"), "other\n");
    assert_output(
        "FUN main() DO SWITCH \"b\" CASE \"a\": print(1); CASE \"b\": print(2); DEFAULT END END",
        "2\n",
    );
    assert_raises_error(
        "FUN main() DO SWITCH 1 CASE 1: LET x = 1; DEFAULT END RETURN x; END",
        ErrorKind::Name,
    );
}

#[test]
fn test_lists() {
    assert_output(
        "LIST xs: Integer = [1, 2, 3]; \
         FUN main() DO xs[1] = 20; print(xs); print(xs[1]); END",
        "[1, 20, 3]\n20\n",
    );
    assert_result(
        "LIST xs = [1, 2]; FUN f() DO xs[0] = 9; END FUN main() DO f(); RETURN xs[0]; END",
        int(9),
    );
    assert_result(
        "LIST xs = [1, 2]; FUN main() DO LET ys = xs; ys[0] = 5; RETURN xs[0]; END",
        int(1),
    );
    assert_raises_error("LIST xs = [1]; FUN main() DO RETURN xs[1]; END", ErrorKind::Runtime);
    assert_raises_error("LIST xs = [1]; FUN main() DO RETURN xs[-1]; END", ErrorKind::Runtime);
    assert_raises_error("LIST xs = [1]; FUN main() DO xs[3] = 1; END", ErrorKind::Runtime);
    assert_raises_error("VAR x = 1; FUN main() DO RETURN x[0]; END", ErrorKind::Runtime);
    assert_raises_error("LIST xs = [1]; FUN main() DO RETURN xs['a']; END", ErrorKind::Runtime);
}

#[test]
fn test_arithmetic_errors() {
    assert_raises_error("FUN main() DO RETURN 1 / 0; END", ErrorKind::DivideByZero);
    assert_raises_error("FUN main() DO RETURN 1.5 % 0.0; END", ErrorKind::DivideByZero);
    assert_raises_error("FUN main() DO RETURN NIL + 1; END", ErrorKind::Runtime);
    assert_raises_error("FUN main() DO RETURN 2 ^ -1; END", ErrorKind::Runtime);
}

#[test]
fn test_logic_evaluates_both_operands() {
    assert_output(
        "FUN side(b) DO print(b); RETURN b; END \
         FUN main() DO LET x = side(FALSE) && side(TRUE); LET y = side(TRUE) || side(FALSE); END",
        "FALSE\nTRUE\nTRUE\nFALSE\n",
    );
}

#[test]
fn test_runtime_errors_carry_spans() {
    let (result, _) = run("FUN main() DO print(1 / 0); END");
    let err = result.unwrap_err();
    assert_eq!(err.offset(), Some(20));
    let (result, _) = run("FUN main() DO nope(); END");
    assert_eq!(result.unwrap_err().offset(), Some(14));
}

#[test]
fn test_analyzed_program_runs() {
    let tokens = tokenize_string(
        "VAL greeting: String = \"n=\"; \
         FUN main(): String DO RETURN greeting + 4; END",
    )
    .unwrap();
    let source = parse(&tokens).unwrap();
    Analyzer::new().analyze(&source).unwrap();
    let mut out = Vec::new();
    let result = Interpreter::with_output(&mut out).evaluate(&source).unwrap();
    assert_eq!(result, Value::String("n=4".into()));
    assert!(out.is_empty());
}

#[test]
fn test_print_builtin_takes_one_argument() {
    let mut out = Vec::new();
    let mut interpreter = Interpreter::with_output(&mut out);
    assert_eq!(print(&mut interpreter, vec![int(7)]).unwrap(), Value::Nil);
    let err = print(&mut interpreter, vec![int(1), int(2)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    drop(interpreter);
    assert_eq!(String::from_utf8(out).unwrap(), "7\n");
}
