// src/accum.rs

// The in-progress token being typed on the keypad. Every transition returns a
// new accumulator; illegal keystrokes are rejected with a specific error.
//
//   Empty -> Dec | Float | Var | Num
//   Dec   -> Dec | Float | Num | Denom
//   Float -> Float
//   Var   -> Var
//   Num   -> Num | Denom
//   Denom -> Denom

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UserError};
use crate::rat::{decimal, Rational};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "val", rename_all = "lowercase")]
pub enum Accumulator {
    #[default]
    Empty,
    Dec {
        #[serde(with = "decimal")]
        value: BigInt,
    },
    /// Fraction digits are kept as typed so leading zeros survive.
    Float {
        #[serde(with = "decimal")]
        integer: BigInt,
        frac: String,
    },
    Var {
        id: String,
    },
    /// Numerator digits are kept as typed so a typed zero shows.
    Num {
        #[serde(with = "decimal")]
        integer: BigInt,
        num: String,
    },
    /// All three parts are digit strings; an empty whole part was never typed.
    Denom {
        integer: String,
        num: String,
        denom: String,
    },
}

fn fold(acc: &BigInt, d: u8) -> BigInt {
    acc * 10u32 + d
}

// Only ASCII digits are ever appended, so the parse cannot fail; an untyped
// part reads as zero.
fn digits(text: &str) -> BigInt {
    text.parse().unwrap_or_default()
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator::Empty
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Accumulator::Empty)
    }

    pub fn clear(&self) -> Self {
        Accumulator::Empty
    }

    // --- Transitions ---

    pub fn digit(&self, d: u8) -> Result<Self> {
        if d > 9 {
            return Err(UserError::NotADigit(d));
        }
        let ch = char::from(b'0' + d);
        Ok(match self {
            Accumulator::Empty => Accumulator::Dec { value: BigInt::from(d) },
            Accumulator::Dec { value } => Accumulator::Dec { value: fold(value, d) },
            Accumulator::Float { integer, frac } => Accumulator::Float {
                integer: integer.clone(),
                frac: format!("{}{}", frac, ch),
            },
            Accumulator::Var { id } => Accumulator::Var { id: format!("{}{}", id, ch) },
            Accumulator::Num { integer, num } => Accumulator::Num {
                integer: integer.clone(),
                num: format!("{}{}", num, ch),
            },
            Accumulator::Denom { integer, num, denom } => Accumulator::Denom {
                integer: integer.clone(),
                num: num.clone(),
                denom: format!("{}{}", denom, ch),
            },
        })
    }

    pub fn decimal(&self) -> Result<Self> {
        match self {
            Accumulator::Empty => {
                Ok(Accumulator::Float { integer: BigInt::zero(), frac: String::new() })
            }
            Accumulator::Dec { value } => {
                Ok(Accumulator::Float { integer: value.clone(), frac: String::new() })
            }
            Accumulator::Float { .. } => Err(UserError::DecimalInFloat),
            Accumulator::Var { .. } => Err(UserError::DecimalInWord),
            Accumulator::Num { .. } => Err(UserError::DecimalInNumerator),
            Accumulator::Denom { .. } => Err(UserError::DecimalInDenominator),
        }
    }

    /// Closes the whole part of a mixed number; following digits are the numerator.
    pub fn num(&self) -> Result<Self> {
        match self {
            Accumulator::Empty => {
                Ok(Accumulator::Num { integer: BigInt::zero(), num: String::new() })
            }
            Accumulator::Dec { value } => {
                Ok(Accumulator::Num { integer: value.clone(), num: String::new() })
            }
            _ => Err(UserError::IllegalNum),
        }
    }

    /// Closes the numerator; following digits are the denominator.
    pub fn denom(&self) -> Result<Self> {
        match self {
            Accumulator::Empty => Err(UserError::IncompleteFrac),
            Accumulator::Dec { value } => Ok(Accumulator::Denom {
                integer: String::new(),
                num: value.to_string(),
                denom: String::new(),
            }),
            Accumulator::Num { integer, num } => Ok(Accumulator::Denom {
                integer: integer.to_string(),
                num: num.clone(),
                denom: String::new(),
            }),
            _ => Err(UserError::IllegalDenom),
        }
    }

    pub fn letter(&self, l: char) -> Result<Self> {
        if !l.is_alphabetic() {
            return Err(UserError::NotALetter(l));
        }
        match self {
            Accumulator::Empty => Ok(Accumulator::Var { id: l.to_string() }),
            Accumulator::Var { id } => Ok(Accumulator::Var { id: format!("{}{}", id, l) }),
            _ => Err(UserError::LetterInNumber),
        }
    }

    // --- Queries ---

    /// The finished token as a stack value.
    pub fn value(&self) -> Result<Value> {
        match self {
            Accumulator::Empty => Err(UserError::EmptyAccum),
            Accumulator::Dec { value } => Ok(Value::Float(value.to_f64().unwrap_or(f64::INFINITY))),
            Accumulator::Float { integer, frac } => {
                let frac = if frac.is_empty() { "0" } else { frac.as_str() };
                let text = format!("{}.{}", integer, frac);
                Ok(Value::Float(text.parse().unwrap_or(f64::INFINITY)))
            }
            Accumulator::Var { id } => Ok(Value::Word(id.clone())),
            Accumulator::Num { .. } => Err(UserError::IncompleteFrac),
            Accumulator::Denom { integer, num, denom } => {
                let denom = digits(denom);
                let r = Rational::new(digits(integer) * &denom + digits(num), denom)?;
                Ok(Value::Rat(r.simplify()))
            }
        }
    }

    /// A human-readable rendering of the partial token. Never fails.
    pub fn display(&self) -> String {
        match self {
            Accumulator::Empty => String::new(),
            Accumulator::Dec { value } => value.to_string(),
            Accumulator::Float { integer, frac } => format!("{}.{}", integer, frac),
            Accumulator::Var { id } => id.clone(),
            Accumulator::Num { integer, num } => format!("{} {}", integer, num),
            Accumulator::Denom { integer, num, denom } if integer.is_empty() => {
                format!("{}/{}", num, denom)
            }
            Accumulator::Denom { integer, num, denom } => format!("{} {}/{}", integer, num, denom),
        }
    }
}
