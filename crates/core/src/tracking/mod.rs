//! Raw activity evidence access

pub mod ports;

pub use ports::{BrowserEventSource, DiffRepository, WindowEventSource};
