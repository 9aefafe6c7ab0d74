//! Append-only event log backends.
//!
//! Records are keyed by a monotonically increasing sequence number, so a full
//! scan replays them in arrival order. The one permitted mutation is the
//! unset -> set transition of a click's dwell time.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AnalyticsError, Result};
use crate::events::{ClickHandle, DwellOutcome, EventRecord};

pub trait EventStore: Send + Sync {
    /// Append a record and return its sequence number.
    fn append(&self, record: EventRecord) -> Result<u64>;

    /// Set the dwell time of the click at `handle` if it is still unset.
    fn complete_dwell(&self, handle: ClickHandle, dwell_secs: f64) -> Result<DwellOutcome>;

    /// All records in sequence order.
    fn snapshot(&self) -> Result<Vec<EventRecord>>;

    fn flush(&self) -> Result<()> { Ok(()) }
}

#[derive(Default)]
pub struct MemoryEventStore {
    next_seq: AtomicU64,
    records: RwLock<BTreeMap<u64, EventRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self { Self::default() }
}

impl EventStore for MemoryEventStore {
    fn append(&self, record: EventRecord) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.records.write().insert(seq, record);
        Ok(seq)
    }

    fn complete_dwell(&self, handle: ClickHandle, dwell_secs: f64) -> Result<DwellOutcome> {
        let mut records = self.records.write();
        match records.get_mut(&handle.0) {
            Some(EventRecord::Click(click)) => match click.dwell_secs {
                Some(_) => Ok(DwellOutcome::AlreadyCompleted),
                None => {
                    click.dwell_secs = Some(dwell_secs);
                    Ok(DwellOutcome::Recorded)
                }
            },
            _ => Err(AnalyticsError::UnknownClick(handle)),
        }
    }

    fn snapshot(&self) -> Result<Vec<EventRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }
}

/// Durable store on an embedded sled tree. Keys are big-endian sequence
/// numbers from `Db::generate_id`, values are bincode-encoded records.
pub struct SledEventStore {
    db: sled::Db,
    events: sled::Tree,
}

impl SledEventStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let db = sled::open(dir.as_ref())?;
        let events = db.open_tree("events")?;
        tracing::info!(path = %dir.as_ref().display(), records = events.len(), "opened event store");
        Ok(Self { db, events })
    }
}

impl EventStore for SledEventStore {
    fn append(&self, record: EventRecord) -> Result<u64> {
        let seq = self.db.generate_id()?;
        let bytes = bincode::serialize(&record)?;
        self.events.insert(seq.to_be_bytes(), bytes)?;
        Ok(seq)
    }

    fn complete_dwell(&self, handle: ClickHandle, dwell_secs: f64) -> Result<DwellOutcome> {
        let key = handle.0.to_be_bytes();
        loop {
            let Some(current) = self.events.get(key)? else {
                return Err(AnalyticsError::UnknownClick(handle));
            };
            let mut click = match bincode::deserialize::<EventRecord>(&current)? {
                EventRecord::Click(click) => click,
                _ => return Err(AnalyticsError::UnknownClick(handle)),
            };
            if click.dwell_secs.is_some() {
                return Ok(DwellOutcome::AlreadyCompleted);
            }
            click.dwell_secs = Some(dwell_secs);
            let updated = bincode::serialize(&EventRecord::Click(click))?;
            match self.events.compare_and_swap(key, Some(current), Some(updated))? {
                Ok(()) => return Ok(DwellOutcome::Recorded),
                // raced with another completion; re-read and decide again
                Err(_) => continue,
            }
        }
    }

    fn snapshot(&self) -> Result<Vec<EventRecord>> {
        let mut out = Vec::with_capacity(self.events.len());
        for item in self.events.iter() {
            let (_, value) = item?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    fn flush(&self) -> Result<()> {
        self.events.flush()?;
        Ok(())
    }
}
