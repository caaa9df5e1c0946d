// src/lib.rs

// --- Module Declarations ---
pub mod accum;
pub mod calc;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod logging;
pub mod rat;
pub mod session;
pub mod units;
pub mod value;


// --- Public API Re-exports ---
pub use accum::Accumulator;
pub use calc::{Calculator, TapeEntry};
pub use dispatch::{DispatchTable, Op, TABLE};
pub use error::{InternalError, PersistError, Result, UserError, ValueError};
pub use history::Undoable;
pub use rat::{ProperFraction, Rational, MAX_APPROX_DENOM};
pub use session::{Action, Headless, Render, Session};
pub use units::{Dimension, Quantity, Registry, System};
pub use value::{Mode, Tag, Value};
