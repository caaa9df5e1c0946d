// src/error.rs

use thiserror::Error;

/// Recoverable errors raised by normal interactive use.
///
/// Every variant is a comparable sentinel; callers and tests match on the
/// variant, never on the rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("stack underflow")]
    Underflow,
    #[error("stack index out of range")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("'{op}' is not implemented for ({signature})")]
    NotImplemented { op: String, signature: String },
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    // --- Accumulator ---
    #[error("nothing has been entered")]
    EmptyAccum,
    #[error("incomplete fraction")]
    IncompleteFrac,
    #[error("number already has a decimal point")]
    DecimalInFloat,
    #[error("illegal: decimal point in word")]
    DecimalInWord,
    #[error("illegal: decimal point in numerator")]
    DecimalInNumerator,
    #[error("illegal: decimal point in denominator")]
    DecimalInDenominator,
    #[error("illegal: cannot start a mixed number here")]
    IllegalNum,
    #[error("illegal: cannot start a denominator here")]
    IllegalDenom,
    #[error("illegal: letter in number")]
    LetterInNumber,
    #[error("'{0}' is not a digit")]
    NotADigit(u8),
    #[error("'{0}' is not a letter")]
    NotALetter(char),

    // --- Stack machine ---
    #[error("store target is not a name")]
    NotAName,

    // --- Units ---
    #[error("incompatible units")]
    IncompatUnits,
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    // --- History ---
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,

    #[error("denominator {0} is too large to approximate")]
    DenominatorTooLarge(u64),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Numeric-domain violations, a subset of user errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{0} is not an integer")]
    NotAnInteger(String),
    #[error("{0} cannot be expressed as a ratio")]
    NotARatio(String),
}

/// Programmer-invariant violations. These indicate a bug, not bad input,
/// and are raised as panics so the full trace surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("operator '{op}' declared with arities {first} and {second}")]
    InconsistentArity { op: String, first: usize, second: usize },
    #[error("accumulator still holds '{0}' after enter")]
    AccumNotEmpty(String),
}

/// Failures writing or reading the persisted state blob. Never shown to the user.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state blob is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
