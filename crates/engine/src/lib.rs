//! Event/rule orchestration engine.
//!
//! Given a newly created event, the [`Orchestrator`] loads the active rules
//! bound to the event's concept, evaluates each one ([`evaluator`]), checks
//! the dedup ledger and runs the rule's action ([`executor`]). Everything
//! happens inside the caller's [`UnitOfWork`]: the event, its audit trail
//! and every consequence commit or roll back together, and broadcasts are
//! published only after commit.
//!
//! The attendance and temporary-state services are the collaborators that
//! create and close events through the orchestrator.

pub mod alerts;
pub mod attendance;
pub mod audit;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod orchestrator;
pub mod temporary_state;
pub mod unit_of_work;

pub use error::{EngineError, EngineResult};
pub use orchestrator::{EvaluationSummary, Orchestrator};
pub use unit_of_work::UnitOfWork;
