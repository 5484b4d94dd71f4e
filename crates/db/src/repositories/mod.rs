//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&mut PgConnection` (transactional work) or `&PgPool` (maintenance) as the
//! first argument.

pub mod action_execution_repo;
pub mod action_repo;
pub mod alert_repo;
pub mod attendance_repo;
pub mod audit_repo;
pub mod concept_repo;
pub mod course_repo;
pub mod event_repo;
pub mod notification_repo;
pub mod rule_repo;
pub mod student_repo;

pub use action_execution_repo::ActionExecutionRepo;
pub use action_repo::ActionRepo;
pub use alert_repo::AlertRepo;
pub use attendance_repo::AttendanceRepo;
pub use audit_repo::AuditRepo;
pub use concept_repo::ConceptRepo;
pub use course_repo::CourseRepo;
pub use event_repo::{EventRepo, EventScope};
pub use notification_repo::NotificationOutboxRepo;
pub use rule_repo::RuleRepo;
pub use student_repo::StudentRepo;
