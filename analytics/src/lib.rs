//! Search analytics: an append-only log of sessions, requests and clicks, and
//! the dashboard statistics recomputed from it.

pub mod error;
pub mod events;
pub mod recorder;
pub mod stats;
pub mod store;
pub mod useragent;

pub use error::{AnalyticsError, Result};
pub use events::{ClickEvent, ClickHandle, Device, DwellOutcome, EventRecord, RequestEvent, Session, SessionId};
pub use recorder::{ClientInfo, EventRecorder, IncomingRequest, RecorderConfig};
pub use stats::{compute_stats, StatsSnapshot};
pub use store::{EventStore, MemoryEventStore, SledEventStore};
