//! Observability: structured logging through `tracing`.

pub mod logging;

pub use logging::{build_filter, init_tracing};
