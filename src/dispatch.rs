// src/dispatch.rs

// Operator resolution over tagged values. Every operator is registered for
// each argument-tag signature it accepts; anything not registered is
// "not implemented". There is no fallback coercion at call time.

use std::collections::HashMap;

use lazy_static::lazy_static;
use paste::paste;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InternalError, Result, UserError};
use crate::rat::{float_to_integer, Rational};
use crate::value::{Tag, Value};

pub type Signature = Vec<Tag>;

/// The implementation stored for one `(operator, signature)` key.
pub type OpFn = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

fn op_fn(f: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> OpFn {
    Box::new(f)
}

pub struct Entry {
    pub ret: Tag,
    pub func: OpFn,
}

// --- Operator Names ---

macro_rules! define_operators {
    ($(($name:literal, $variant:ident)),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum Op {
            $($variant),*
        }

        /// Keypad name -> operator.
        pub static OP_MAP: phf::Map<&'static str, Op> = phf::phf_map! {
            $( $name => Op::$variant, )*
        };

        impl Op {
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => $name),*
                }
            }
        }
    };
}

define_operators! {
    ("add", Add), ("sub", Sub), ("mul", Mul), ("div", Div),
    ("neg", Neg), ("abs", Abs), ("inv", Inv), ("floor", Floor), ("ceil", Ceil),
    ("sqrt", Sqrt), ("exp", Exp), ("ln", Ln), ("log10", Log10),
    ("sin", Sin), ("cos", Cos), ("tan", Tan),
    ("pow", Pow), ("hypot", Hypot),
    ("f2", F2), ("f4", F4), ("f8", F8), ("f16", F16), ("f32", F32), ("f64", F64),
    ("float", Float), ("frac", Frac), ("ratio", Ratio),
}

impl Op {
    pub fn from_name(name: &str) -> Option<Op> {
        OP_MAP.get(name).copied()
    }
}

// --- Family Macros ---

// Scientific functions whose float implementation is `f64::<name>`.
macro_rules! poly_math {
    ($table:ident; $($name:ident),* $(,)?) => {
        paste! { $( $table.poly_math(Op::[<$name:camel>], f64::$name); )* }
    };
}

// `f<d>` operators dividing by a fixed integer.
macro_rules! divisors {
    ($table:ident; $($d:literal),* $(,)?) => {
        paste! { $( $table.divisor(Op::[<F $d>], $d); )* }
    };
}

fn promote(value: &Value) -> Result<Rational> {
    match value {
        Value::Rat(r) => Ok(r.clone()),
        Value::Float(x) => Rational::from_float(*x),
        Value::Word(_) => unreachable!("words are never registered in numeric signatures"),
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Float(x) => *x,
        Value::Rat(r) => r.to_float(),
        Value::Word(_) => unreachable!("words are never registered in numeric signatures"),
    }
}

fn signature_string(sig: &[Tag]) -> String {
    sig.iter().map(Tag::to_string).collect::<Vec<_>>().join(", ")
}

// --- The Table ---

#[derive(Default)]
pub struct DispatchTable {
    entries: HashMap<(Op, Signature), Entry>,
    arity: HashMap<Op, usize>,
    conflicts: Vec<InternalError>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The calculator's operator set.
    pub fn standard() -> Self {
        let mut table = Self::new();

        table.poly_binop(Op::Add, |a, b| a + b, |a, b| Ok(a.add(b)));
        table.poly_binop(Op::Sub, |a, b| a - b, |a, b| Ok(a.sub(b)));
        table.poly_binop(Op::Mul, |a, b| a * b, |a, b| Ok(a.mul(b)));
        table.poly_binop(Op::Div, |a, b| a / b, Rational::div);

        table.poly_unop(Op::Neg, |x| -x, |r| Ok(r.neg()));
        table.poly_unop(Op::Abs, f64::abs, |r| Ok(r.abs()));
        table.poly_unop(Op::Inv, |x| 1.0 / x, Rational::inv);
        table.poly_unop(Op::Floor, f64::floor, |r| Ok(r.floor()));
        table.poly_unop(Op::Ceil, f64::ceil, |r| Ok(r.ceil()));

        poly_math!(table; sqrt, exp, ln, log10, sin, cos, tan);
        table.poly_binmath(Op::Pow, f64::powf);
        table.poly_binmath(Op::Hypot, f64::hypot);

        divisors!(table; 2, 4, 8, 16, 32, 64);

        table.mono_unop(Op::Float, Tag::Rat, Tag::Float, |v| Ok(Value::Float(as_float(v))));
        table.mono_unop(Op::Frac, Tag::Float, Tag::Rat, |v| Ok(Value::Rat(promote(v)?)));
        table.mono_binop(Op::Ratio, [Tag::Float, Tag::Float], Tag::Rat, |a, b| {
            let num = float_to_integer(as_float(a))?;
            let denom = float_to_integer(as_float(b))?;
            Ok(Value::Rat(Rational::new(num, denom)?.simplify()))
        });

        table
    }

    /// Registers one signature. Arity conflicts are collected and reported by `verify`.
    pub fn insert(&mut self, op: Op, sig: &[Tag], ret: Tag, func: OpFn) {
        match self.arity.get(&op) {
            Some(&known) if known != sig.len() => {
                self.conflicts.push(InternalError::InconsistentArity {
                    op: op.name().to_string(),
                    first: known,
                    second: sig.len(),
                });
            }
            Some(_) => {}
            None => {
                self.arity.insert(op, sig.len());
            }
        }
        self.entries.insert((op, sig.to_vec()), Entry { ret, func });
    }

    /// Every signature sharing a name must share an arity.
    pub fn verify(&self) -> std::result::Result<(), InternalError> {
        match self.conflicts.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // --- Combinators ---

    /// `[float] -> float`, `[rat] -> rat`.
    pub fn poly_unop(
        &mut self,
        op: Op,
        float_fn: fn(f64) -> f64,
        rat_fn: fn(&Rational) -> Result<Rational>,
    ) {
        self.insert(
            op,
            &[Tag::Float],
            Tag::Float,
            op_fn(move |args| Ok(Value::Float(float_fn(as_float(&args[0]))))),
        );
        self.insert(
            op,
            &[Tag::Rat],
            Tag::Rat,
            op_fn(move |args| Ok(Value::Rat(rat_fn(&promote(&args[0])?)?))),
        );
    }

    /// `[float, float] -> float`; any signature containing a rat promotes the
    /// floats and uses the rational implementation.
    pub fn poly_binop(
        &mut self,
        op: Op,
        float_fn: fn(f64, f64) -> f64,
        rat_fn: fn(&Rational, &Rational) -> Result<Rational>,
    ) {
        self.insert(
            op,
            &[Tag::Float, Tag::Float],
            Tag::Float,
            op_fn(move |args| Ok(Value::Float(float_fn(as_float(&args[0]), as_float(&args[1]))))),
        );
        for sig in [[Tag::Float, Tag::Rat], [Tag::Rat, Tag::Float], [Tag::Rat, Tag::Rat]] {
            self.insert(
                op,
                &sig,
                Tag::Rat,
                op_fn(move |args| {
                    Ok(Value::Rat(rat_fn(&promote(&args[0])?, &promote(&args[1])?)?))
                }),
            );
        }
    }

    /// Floats stay floats; rationals round-trip through a float and come back rational.
    pub fn poly_math(&mut self, op: Op, f: fn(f64) -> f64) {
        self.insert(
            op,
            &[Tag::Float],
            Tag::Float,
            op_fn(move |args| Ok(Value::Float(f(as_float(&args[0]))))),
        );
        self.insert(
            op,
            &[Tag::Rat],
            Tag::Rat,
            op_fn(move |args| Ok(Value::Rat(Rational::from_float(f(as_float(&args[0])))?))),
        );
    }

    /// Binary form of `poly_math`. The first argument's tag decides the result tag.
    pub fn poly_binmath(&mut self, op: Op, f: fn(f64, f64) -> f64) {
        for first in [Tag::Float, Tag::Rat] {
            for second in [Tag::Float, Tag::Rat] {
                let func: OpFn = match first {
                    Tag::Rat => op_fn(move |args| {
                        let x = f(as_float(&args[0]), as_float(&args[1]));
                        Ok(Value::Rat(Rational::from_float(x)?))
                    }),
                    _ => op_fn(move |args| {
                        Ok(Value::Float(f(as_float(&args[0]), as_float(&args[1]))))
                    }),
                };
                self.insert(op, &[first, second], first, func);
            }
        }
    }

    /// Divides by the constant `d`, always producing a rational.
    pub fn divisor(&mut self, op: Op, d: i64) {
        for tag in [Tag::Float, Tag::Rat] {
            self.insert(
                op,
                &[tag],
                Tag::Rat,
                op_fn(move |args| {
                    Ok(Value::Rat(promote(&args[0])?.div(&Rational::from_integer(d))?))
                }),
            );
        }
    }

    pub fn mono_unop(&mut self, op: Op, arg: Tag, ret: Tag, f: fn(&Value) -> Result<Value>) {
        self.insert(op, &[arg], ret, op_fn(move |args| f(&args[0])));
    }

    pub fn mono_binop(
        &mut self,
        op: Op,
        args: [Tag; 2],
        ret: Tag,
        f: fn(&Value, &Value) -> Result<Value>,
    ) {
        self.insert(op, &args, ret, op_fn(move |a| f(&a[0], &a[1])));
    }

    // --- Queries ---

    pub fn arity(&self, op: Op) -> Option<usize> {
        self.arity.get(&op).copied()
    }

    /// Pops the operator's arguments off `stack`, applies it, and returns the new stack.
    pub fn apply(&self, stack: &[Value], op: Op) -> Result<Vec<Value>> {
        let not_implemented = |sig: &[Tag]| UserError::NotImplemented {
            op: op.name().to_string(),
            signature: signature_string(sig),
        };
        let arity = self.arity(op).ok_or_else(|| not_implemented(&[]))?;
        if stack.len() < arity {
            return Err(UserError::Underflow);
        }
        let split = stack.len() - arity;
        let args = &stack[split..];
        let sig: Signature = args.iter().map(Value::tag).collect();

        let entry = self.entries.get(&(op, sig.clone())).ok_or_else(|| not_implemented(&sig))?;
        let result = (entry.func)(args)?;
        assert_eq!(result.tag(), entry.ret, "'{}' returned a value of the wrong tag", op.name());
        debug!(
            op = op.name(),
            signature = %signature_string(&sig),
            result = %result,
            "applied operator"
        );

        let mut next = stack[..split].to_vec();
        next.push(result);
        Ok(next)
    }

    /// Operators accepting the current top-of-stack signature, sorted by name.
    pub fn valid(&self, stack: &[Value]) -> Vec<Op> {
        let mut ops: Vec<Op> = self
            .arity
            .iter()
            .filter(|&(&op, &arity)| {
                arity <= stack.len() && {
                    let sig: Signature =
                        stack[stack.len() - arity..].iter().map(Value::tag).collect();
                    self.entries.contains_key(&(op, sig))
                }
            })
            .map(|(&op, _)| op)
            .collect();
        ops.sort_by_key(|op| op.name());
        ops
    }
}

lazy_static! {
    /// The shared operator table, built and verified once.
    pub static ref TABLE: DispatchTable = {
        let table = DispatchTable::standard();
        if let Err(err) = table.verify() {
            panic!("{}", err);
        }
        table
    };
}
