// tests/test_utils.rs

use rat_calc::{Action, Calculator, Headless, Session, Value};

// Splits a line into actions: numbers and 'words are typed key by key and
// entered, `=` stores, anything else is an operator.
#[allow(dead_code)]
pub fn actions(input: &str) -> Vec<Action> {
    let mut out = Vec::new();
    for token in input.split_whitespace() {
        match token {
            "=" => out.push(Action::Store),
            "undo" => out.push(Action::Undo),
            "redo" => out.push(Action::Redo),
            "swap" => out.push(Action::Exch(-1, -2)),
            t if t.starts_with('\'') || t.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                for ch in t.trim_start_matches('\'').chars() {
                    out.push(match ch {
                        '0'..='9' => Action::Digit(ch as u8 - b'0'),
                        '.' => Action::Decimal,
                        '_' => Action::Num,
                        '/' => Action::Denom,
                        l => Action::Letter(l),
                    });
                }
                out.push(Action::Enter);
            }
            name => out.push(Action::Operator(name.to_string())),
        }
    }
    out
}

// Runs a line through a fresh in-memory session, panicking on any rejection.
#[allow(dead_code)]
pub fn session_ok(input: &str) -> Session<Headless> {
    let mut session = Session::new(Headless);
    session.dispatch_all(actions(input)).unwrap();
    session
}

#[allow(dead_code)]
pub fn calc_ok(input: &str) -> Calculator {
    session_ok(input).calc().clone()
}

#[allow(dead_code)]
pub fn top_ok(input: &str) -> Value {
    calc_ok(input).top().unwrap().clone()
}

// Assertion helper for comparing floats with tolerance
#[allow(dead_code)]
pub fn assert_float_eq(actual: f64, expected: f64, tolerance: f64) {
    assert!((actual - expected).abs() < tolerance,
            "Expected {}, got {}, difference: {}",
            expected, actual, (actual - expected).abs());
}

#[allow(dead_code)]
pub fn assert_float_value(actual: &Value, expected: f64) {
    match actual {
        Value::Float(x) => assert_float_eq(*x, expected, 1e-10),
        other => panic!("Expected a float near {}, got {:?}", expected, other),
    }
}
