use thiserror::Error;

use crate::events::ClickHandle;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("event store error: {0}")]
    Store(#[from] sled::Error),

    #[error("event codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("no click event for handle {0}")]
    UnknownClick(ClickHandle),

    #[error("invalid dwell duration {0}s")]
    InvalidDwell(f64),

    #[error("timed out resolving session for client {0}")]
    SessionLockTimeout(String),
}
