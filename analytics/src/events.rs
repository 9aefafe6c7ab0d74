use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub type SessionId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    /// Opaque key the serving layer identifies the client by.
    pub client_key: String,
    pub ip: String,
    pub user_agent: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Desktop,
    Mobile,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Desktop => f.write_str("Desktop"),
            Device::Mobile => f.write_str("Mobile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub session_id: SessionId,
    pub path: String,
    pub method: String,
    /// Search text carried by the request; empty for non-search requests.
    pub query_string: String,
    pub term_count: u32,
    pub browser: String,
    pub device: Device,
    #[serde(with = "time::serde::timestamp")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub session_id: SessionId,
    pub document_id: String,
    pub rank: u32,
    pub query: String,
    #[serde(with = "time::serde::timestamp")]
    pub timestamp: OffsetDateTime,
    /// Unset until the user returns; set at most once.
    pub dwell_secs: Option<f64>,
}

/// One entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventRecord {
    Session(Session),
    Request(RequestEvent),
    Click(ClickEvent),
}

/// Opaque reference to a stored click, used to back-fill its dwell time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickHandle(pub u64);

impl fmt::Display for ClickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellOutcome {
    Recorded,
    /// The click already had a dwell time; the new value was ignored.
    AlreadyCompleted,
}
