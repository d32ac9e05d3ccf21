//! Core types, validation, and the dedup window for the event pipeline.

pub mod analytics;
pub mod clock;
pub mod dedup;
pub mod error;
pub mod events;
pub mod extract;
pub mod hashing;
pub mod limits;
pub mod metadata;
pub mod query;
pub mod retention;
pub mod stored;
pub mod tenant;

pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use dedup::{DedupConfig, DedupWindow, Observation};
pub use error::{Error, Result};
pub use events::*;
pub use query::{EventPage, EventQuery};
pub use retention::*;
pub use stored::*;
pub use tenant::*;
