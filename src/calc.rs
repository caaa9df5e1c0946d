// src/calc.rs

// The stack machine behind the keypad. Every action takes `&self` and returns
// a new `Calculator`; nothing is mutated in place, so old states can be kept
// as undo snapshots.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accum::Accumulator;
use crate::dispatch::{Op, TABLE};
use crate::error::{InternalError, Result, UserError};
use crate::rat::Rational;
use crate::value::{Mode, Value};

/// One line of the audit log. Replaying the tape rebuilds the stack and definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapeEntry {
    Push(Value),
    Apply(Op),
    Store,
    Exch(usize, usize),
}

impl fmt::Display for TapeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapeEntry::Push(v) => write!(f, "{}", v),
            TapeEntry::Apply(op) => write!(f, "{}", op.name()),
            TapeEntry::Store => write!(f, "="),
            TapeEntry::Exch(a, b) => write!(f, "exch {} {}", a, b),
        }
    }
}

/// Names bound before anything is stored.
pub fn builtin_defs() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("pi".to_string(), Value::Float(std::f64::consts::PI)),
        ("e".to_string(), Value::Float(std::f64::consts::E)),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculator {
    stack: Vec<Value>,
    tape: Vec<TapeEntry>,
    defs: BTreeMap<String, Value>,
    accum: Accumulator,
    showing: Mode,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub fn new() -> Self {
        Calculator {
            stack: Vec::new(),
            tape: Vec::new(),
            defs: builtin_defs(),
            accum: Accumulator::new(),
            showing: Mode::default(),
        }
    }

    /// Rebuilds a calculator by running a tape against a fresh one.
    pub fn replay(tape: &[TapeEntry]) -> Result<Self> {
        tape.iter().try_fold(Calculator::new(), |calc, entry| match entry {
            TapeEntry::Push(v) => Ok(calc.push(v.clone())),
            TapeEntry::Apply(op) => calc.apply(*op),
            TapeEntry::Store => calc.store(),
            TapeEntry::Exch(a, b) => calc.exch(*a as isize, *b as isize),
        })
    }

    // --- Queries ---

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn tape(&self) -> &[TapeEntry] {
        &self.tape
    }

    pub fn defs(&self) -> &BTreeMap<String, Value> {
        &self.defs
    }

    pub fn accum(&self) -> &Accumulator {
        &self.accum
    }

    pub fn showing(&self) -> Mode {
        self.showing
    }

    pub fn top(&self) -> Result<&Value> {
        self.stack.last().ok_or(UserError::Underflow)
    }

    /// The partially typed token.
    pub fn display(&self) -> String {
        self.accum.display()
    }

    pub fn is_empty(&self) -> bool {
        self.accum.is_empty()
    }

    /// The stack rendered in the current display mode, bottom first.
    pub fn rendered_stack(&self) -> Vec<String> {
        self.stack.iter().map(|v| v.display(self.showing)).collect()
    }

    /// Operators that accept the current top of stack.
    pub fn valid(&self) -> Vec<Op> {
        TABLE.valid(&self.stack)
    }

    // --- Keystrokes ---

    fn with_accum(&self, accum: Accumulator) -> Self {
        Calculator { accum, ..self.clone() }
    }

    pub fn digit(&self, d: u8) -> Result<Self> {
        Ok(self.with_accum(self.accum.digit(d)?))
    }

    pub fn decimal(&self) -> Result<Self> {
        Ok(self.with_accum(self.accum.decimal()?))
    }

    pub fn letter(&self, l: char) -> Result<Self> {
        Ok(self.with_accum(self.accum.letter(l)?))
    }

    pub fn num(&self) -> Result<Self> {
        Ok(self.with_accum(self.accum.num()?))
    }

    pub fn denom(&self) -> Result<Self> {
        Ok(self.with_accum(self.accum.denom()?))
    }

    pub fn clear(&self) -> Self {
        self.with_accum(self.accum.clear())
    }

    // --- Stack Actions ---

    /// Pushes a value. A bound word is replaced by its definition on the
    /// stack, but the tape records the word as typed.
    pub fn push(&self, value: Value) -> Self {
        let mut next = self.clone();
        let resolved = match &value {
            Value::Word(w) => next.defs.get(w).cloned().unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        };
        next.tape.push(TapeEntry::Push(value));
        next.stack.push(resolved);
        next
    }

    /// Commits the accumulator to the stack. A no-op when nothing is typed.
    pub fn enter(&self) -> Result<Self> {
        if self.accum.is_empty() {
            return Ok(self.clone());
        }
        let value = match (self.accum.value()?, self.showing) {
            // Fraction mode keeps everything exact.
            (Value::Float(x), Mode::Frac) => Value::Rat(Rational::from_float(x)?),
            (value, _) => value,
        };
        debug!(value = %value, "enter");
        Ok(self.clear().push(value))
    }

    // Every structural action auto-enters first.
    fn flushed(&self) -> Result<Self> {
        let next = self.enter()?;
        if !next.accum.is_empty() {
            panic!("{}", InternalError::AccumNotEmpty(next.accum.display()));
        }
        Ok(next)
    }

    pub fn operator(&self, name: &str) -> Result<Self> {
        let op = Op::from_name(name).ok_or_else(|| UserError::UnknownOperator(name.to_string()))?;
        self.apply(op)
    }

    pub fn apply(&self, op: Op) -> Result<Self> {
        let mut next = self.flushed()?;
        next.stack = TABLE.apply(&next.stack, op)?;
        next.tape.push(TapeEntry::Apply(op));
        Ok(next)
    }

    /// Swaps two stack slots. Negative indices count from the top (`-1` is the top).
    pub fn exch(&self, a: isize, b: isize) -> Result<Self> {
        let mut next = self.flushed()?;
        let a = resolve_index(a, next.stack.len())?;
        let b = resolve_index(b, next.stack.len())?;
        next.stack.swap(a, b);
        next.tape.push(TapeEntry::Exch(a, b));
        Ok(next)
    }

    /// Binds the value under the top of the stack to the word on top.
    pub fn store(&self) -> Result<Self> {
        let mut next = self.flushed()?;
        if next.stack.len() < 2 {
            return Err(UserError::Underflow);
        }
        let slot = match next.stack.pop() {
            Some(Value::Word(w)) => w,
            _ => return Err(UserError::NotAName),
        };
        let value = next.stack.pop().ok_or(UserError::Underflow)?;
        debug!(slot = %slot, value = %value, "store");
        next.defs.insert(slot, value);
        next.tape.push(TapeEntry::Store);
        Ok(next)
    }

    pub fn show(&self, mode: Mode) -> Self {
        Calculator { showing: mode, ..self.clone() }
    }

    pub fn reset(&self) -> Self {
        Calculator::new()
    }
}

fn resolve_index(i: isize, len: usize) -> Result<usize> {
    let resolved = if i < 0 { len as isize + i } else { i };
    if resolved < 0 {
        return Err(UserError::Underflow);
    }
    if resolved as usize >= len {
        return Err(UserError::Overflow);
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(calc: Calculator, keys: &str) -> Calculator {
        keys.chars().fold(calc, |calc, key| match key {
            '0'..='9' => calc.digit(key as u8 - b'0').unwrap(),
            '.' => calc.decimal().unwrap(),
            '_' => calc.num().unwrap(),
            '/' => calc.denom().unwrap(),
            ' ' => calc.enter().unwrap(),
            l => calc.letter(l).unwrap(),
        })
    }

    #[test]
    fn test_enter_on_empty_is_noop() {
        let calc = Calculator::new();
        assert_eq!(calc.enter().unwrap(), calc);
    }

    #[test]
    fn test_enter_pushes_and_clears() {
        let calc = typed(Calculator::new(), "4.5").enter().unwrap();
        assert_eq!(calc.stack(), &[Value::Float(4.5)]);
        assert!(calc.is_empty());
        assert_eq!(calc.tape(), &[TapeEntry::Push(Value::Float(4.5))]);
    }

    #[test]
    fn test_frac_mode_coerces_floats() {
        let calc = typed(Calculator::new().show(Mode::Frac), "0.75").enter().unwrap();
        assert_eq!(calc.stack(), &[Value::rat(3, 4)]);
        assert_eq!(calc.rendered_stack(), vec!["3/4".to_string()]);
    }

    #[test]
    fn test_operator_auto_enters() {
        let calc = typed(Calculator::new(), "3 1/2").operator("add").unwrap();
        assert_eq!(calc.stack(), &[Value::rat(7, 2)]);
        assert_eq!(calc.tape().last(), Some(&TapeEntry::Apply(Op::Add)));
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(
            Calculator::new().operator("frobnicate"),
            Err(UserError::UnknownOperator("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_push_resolves_bound_words() {
        let calc = typed(Calculator::new(), "pi ");
        assert_eq!(calc.stack(), &[Value::Float(std::f64::consts::PI)]);
        assert_eq!(calc.tape(), &[TapeEntry::Push(Value::Word("pi".to_string()))]);

        let calc = typed(Calculator::new(), "zed ");
        assert_eq!(calc.stack(), &[Value::Word("zed".to_string())]);
    }

    #[test]
    fn test_exch() {
        let calc = typed(Calculator::new(), "4 5 ");
        let swapped = calc.exch(-1, -2).unwrap();
        assert_eq!(swapped.stack(), &[Value::Float(5.0), Value::Float(4.0)]);
        assert_eq!(swapped.tape().last(), Some(&TapeEntry::Exch(1, 0)));

        assert_eq!(Calculator::new().exch(1, 0), Err(UserError::Overflow));
        assert_eq!(calc.exch(2, 0), Err(UserError::Overflow));
        assert_eq!(calc.exch(-3, 0), Err(UserError::Underflow));
    }

    #[test]
    fn test_store_binds_name() {
        let calc = typed(Calculator::new(), "12 x").store().unwrap();
        assert!(calc.stack().is_empty());
        assert_eq!(calc.defs().get("x"), Some(&Value::Float(12.0)));
        assert_eq!(calc.tape().last(), Some(&TapeEntry::Store));

        let calc = typed(calc, "x ");
        assert_eq!(calc.top(), Ok(&Value::Float(12.0)));
    }

    #[test]
    fn test_store_needs_two_values() {
        // Fewer than two values is an underflow rather than a silent no-op.
        assert_eq!(Calculator::new().store(), Err(UserError::Underflow));
        assert_eq!(typed(Calculator::new(), "x").store(), Err(UserError::Underflow));
        assert_eq!(typed(Calculator::new(), "1 2").store(), Err(UserError::NotAName));
    }

    #[test]
    fn test_top_and_reset() {
        assert_eq!(Calculator::new().top(), Err(UserError::Underflow));
        let calc = typed(Calculator::new().show(Mode::Frac), "7 q").store().unwrap();
        let fresh = calc.reset();
        assert_eq!(fresh, Calculator::new());
        assert!(!fresh.defs().contains_key("q"));
        assert!(fresh.defs().contains_key("pi"));
    }

    #[test]
    fn test_failed_action_leaves_state_alone() {
        let calc = typed(Calculator::new(), "1");
        assert_eq!(calc.operator("add"), Err(UserError::Underflow));
        assert_eq!(calc.stack(), &[] as &[Value]);
        assert_eq!(calc.display(), "1");
    }

    #[test]
    fn test_replay_reproduces_stack_and_defs() {
        let calc = typed(Calculator::new(), "3 1/4 r")
            .store()
            .map(|c| typed(c, "r 2 "))
            .and_then(|c| c.operator("mul"))
            .and_then(|c| c.exch(0, 0))
            .map(|c| typed(c.show(Mode::Frac), "0.5 "))
            .and_then(|c| c.operator("sub"))
            .unwrap();
        let replayed = Calculator::replay(calc.tape()).unwrap();
        assert_eq!(replayed.stack(), calc.stack());
        assert_eq!(replayed.defs(), calc.defs());
        assert_eq!(calc.stack(), &[Value::Float(3.0), Value::rat(0, 1)]);
    }
}
