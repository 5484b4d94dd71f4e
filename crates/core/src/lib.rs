//! Domain vocabulary shared by every vigia crate.
//!
//! No I/O lives here: ids and timestamps, the error type, the rule condition
//! and action sum types, audit and broadcast names, and the clock port.

pub mod action;
pub mod audit;
pub mod clock;
pub mod condition;
pub mod error;
pub mod messages;
pub mod status;
pub mod types;
