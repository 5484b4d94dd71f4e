//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where the engine inserts rows, a create DTO.

pub mod action;
pub mod action_execution;
pub mod alert;
pub mod attendance;
pub mod audit;
pub mod concept;
pub mod course;
pub mod event;
pub mod notification;
pub mod rule;
pub mod student;
