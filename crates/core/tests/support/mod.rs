//! Shared test helpers for `skilltrail-core` integration tests.
//!
//! In-memory fakes for every port plus small fixture builders, so the
//! suites can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod collaborators;
pub mod event_source;
pub mod fixtures;
pub mod session_repository;
pub mod skill_store;

pub use collaborators::{StubRetriever, StubSummarizer};
pub use event_source::{FailingEventSource, InMemoryEventSource};
pub use fixtures::*;
pub use session_repository::InMemorySessionRepository;
pub use skill_store::{InMemorySkillActivityRepository, InMemorySkillRepository};
