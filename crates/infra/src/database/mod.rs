//! Database implementations

pub mod event_store;
pub mod manager;
pub mod session_repository;
pub mod skill_activity_repository;
pub mod skill_repository;
mod sql;

pub use event_store::SqliteEventStore;
pub use manager::*;
pub use session_repository::SqliteSessionRepository;
pub use skill_activity_repository::SqliteSkillActivityRepository;
pub use skill_repository::SqliteSkillRepository;
