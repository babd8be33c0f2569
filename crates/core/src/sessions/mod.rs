//! Session segmentation and persistence

pub mod locks;
pub mod ports;
pub mod segmenter;
pub mod service;

pub use locks::DateLocks;
pub use ports::SessionRepository;
pub use segmenter::{attach_browser_events, SessionCandidate, SessionSegmenter};
pub use service::{BuildOutcome, RebuildOutcome, SessionBuildService, REBUILD_MARGIN_HOURS};
