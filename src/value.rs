// src/value.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rat::Rational;

/// The kind of a stack value. Dispatch signatures are tuples of tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Float,
    Rat,
    Word,
}

/// A fully resolved stack value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "value", rename_all = "lowercase")]
pub enum Value {
    Float(f64),
    Rat(Rational),
    Word(String),
}

/// How values are rendered for the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Decimal,
    Frac,
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Value::Float(_) => Tag::Float,
            Value::Rat(_) => Tag::Rat,
            Value::Word(_) => Tag::Word,
        }
    }

    pub fn rat(num: i64, denom: i64) -> Value {
        Value::Rat(Rational { num: num.into(), denom: denom.into() })
    }

    pub fn display(&self, mode: Mode) -> String {
        match (self, mode) {
            (Value::Rat(r), Mode::Frac) => r.to_proper().to_string(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Float => write!(f, "float"),
            Tag::Rat => write!(f, "rat"),
            Tag::Word => write!(f, "word"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(x) => write!(f, "{}", x),
            Value::Rat(r) => write!(f, "{}", r),
            Value::Word(w) => write!(f, "{}", w),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Decimal => write!(f, "decimal"),
            Mode::Frac => write!(f, "frac"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decimal" | "float" => Ok(Mode::Decimal),
            "frac" => Ok(Mode::Frac),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}
