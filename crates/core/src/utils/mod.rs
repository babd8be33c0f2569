//! Shared helpers for core services

pub mod time;
