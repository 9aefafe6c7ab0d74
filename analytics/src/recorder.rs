use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use search_core::tokenizer::normalize;

use crate::error::{AnalyticsError, Result};
use crate::events::{ClickEvent, ClickHandle, DwellOutcome, EventRecord, RequestEvent, Session, SessionId};
use crate::stats::{compute_stats, StatsSnapshot};
use crate::store::EventStore;
use crate::useragent;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Idle time after which a client gets a new session.
    pub session_ttl: Duration,
    pub lock_stripes: usize,
    pub lock_attempt_timeout: Duration,
    pub lock_attempts: u32,
    /// Minimum spacing between sweeps that drop expired sessions from memory.
    pub sweep_interval: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 60),
            lock_stripes: 64,
            lock_attempt_timeout: Duration::from_millis(50),
            lock_attempts: 100,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Who sent a request, as seen by the serving layer.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub key: String,
    pub ip: String,
    pub user_agent: String,
}

/// The request-specific part of a [`RequestEvent`].
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub path: String,
    pub method: String,
    pub query_string: String,
}

struct ActiveSession {
    session: Session,
    last_seen: AtomicI64, // unix seconds
}

/// Records sessions, requests, clicks and dwell completions into an [`EventStore`].
///
/// Session creation is serialized per client key through a striped lock so
/// concurrent first requests from one client produce a single session.
pub struct EventRecorder {
    store: Arc<dyn EventStore>,
    sessions: RwLock<HashMap<String, Arc<ActiveSession>>>,
    stripes: Vec<Mutex<()>>,
    last_sweep: AtomicI64,
    config: RecorderConfig,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn EventStore>) -> Result<Self> {
        Self::with_config(store, RecorderConfig::default())
    }

    /// Build a recorder, re-registering each client's most recent session
    /// from the existing log so a restart does not split live sessions.
    /// A session's last-seen time is its latest request, and sessions idle
    /// past the TTL are left out.
    pub fn with_config(store: Arc<dyn EventStore>, config: RecorderConfig) -> Result<Self> {
        let mut latest: HashMap<String, Session> = HashMap::new();
        let mut last_request: HashMap<SessionId, i64> = HashMap::new();
        for record in store.snapshot()? {
            match record {
                EventRecord::Session(s) => {
                    latest.insert(s.client_key.clone(), s);
                }
                EventRecord::Request(r) => {
                    let ts = r.timestamp.unix_timestamp();
                    let seen = last_request.entry(r.session_id).or_insert(ts);
                    *seen = (*seen).max(ts);
                }
                EventRecord::Click(_) => {}
            }
        }

        let now_s = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = config.session_ttl.as_secs() as i64;
        let mut sessions: HashMap<String, Arc<ActiveSession>> = HashMap::new();
        for (key, s) in latest {
            let mut seen = s.created_at.unix_timestamp();
            if let Some(&ts) = last_request.get(&s.session_id) {
                seen = seen.max(ts);
            }
            if now_s - seen > ttl {
                continue;
            }
            sessions.insert(key, Arc::new(ActiveSession { session: s, last_seen: AtomicI64::new(seen) }));
        }
        if !sessions.is_empty() {
            tracing::info!(sessions = sessions.len(), "restored sessions from event log");
        }
        let stripes = (0..config.lock_stripes.max(1)).map(|_| Mutex::new(())).collect();
        Ok(Self { store, sessions: RwLock::new(sessions), stripes, last_sweep: AtomicI64::new(now_s), config })
    }

    pub fn store(&self) -> &Arc<dyn EventStore> { &self.store }

    fn stripe(&self, key: &str) -> &Mutex<()> {
        let mut h = DefaultHasher::new();
        key.hash(&mut h);
        &self.stripes[(h.finish() as usize) % self.stripes.len()]
    }

    fn live(&self, key: &str, now: OffsetDateTime) -> Option<Session> {
        let sessions = self.sessions.read();
        let active = sessions.get(key)?;
        let ttl = self.config.session_ttl.as_secs() as i64;
        let now_s = now.unix_timestamp();
        if now_s - active.last_seen.load(Ordering::Relaxed) > ttl {
            return None;
        }
        active.last_seen.store(now_s, Ordering::Relaxed);
        Some(active.session.clone())
    }

    /// Return the client's live session or create one.
    pub fn resolve_session(&self, client: &ClientInfo) -> Result<Session> {
        let now = OffsetDateTime::now_utc();
        if let Some(session) = self.live(&client.key, now) {
            return Ok(session);
        }

        let stripe = self.stripe(&client.key);
        let mut attempts = 0;
        let _guard = loop {
            if let Some(guard) = stripe.try_lock_for(self.config.lock_attempt_timeout) {
                break guard;
            }
            attempts += 1;
            tracing::debug!(client = %client.key, attempts, "session lock contended, retrying");
            if attempts >= self.config.lock_attempts {
                return Err(AnalyticsError::SessionLockTimeout(client.key.clone()));
            }
        };

        // another request may have created it while we waited
        if let Some(session) = self.live(&client.key, now) {
            return Ok(session);
        }

        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            client_key: client.key.clone(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            created_at: now,
        };
        self.store.append(EventRecord::Session(session.clone()))?;
        let now_s = now.unix_timestamp();
        let active = Arc::new(ActiveSession { session: session.clone(), last_seen: AtomicI64::new(now_s) });
        let mut sessions = self.sessions.write();
        self.sweep_expired(&mut sessions, now_s);
        sessions.insert(client.key.clone(), active);
        drop(sessions);
        tracing::debug!(session_id = %session.session_id, client = %client.key, "session created");
        Ok(session)
    }

    /// Drop idle sessions, at most once per `sweep_interval`.
    fn sweep_expired(&self, sessions: &mut HashMap<String, Arc<ActiveSession>>, now_s: i64) {
        let interval = self.config.sweep_interval.as_secs() as i64;
        if now_s - self.last_sweep.load(Ordering::Relaxed) < interval {
            return;
        }
        self.last_sweep.store(now_s, Ordering::Relaxed);
        let ttl = self.config.session_ttl.as_secs() as i64;
        let before = sessions.len();
        sessions.retain(|_, active| now_s - active.last_seen.load(Ordering::Relaxed) <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
    }

    pub fn record_request(&self, client: &ClientInfo, request: IncomingRequest) -> Result<RequestEvent> {
        let session = self.resolve_session(client)?;
        let event = RequestEvent {
            session_id: session.session_id,
            term_count: normalize(&request.query_string).len() as u32,
            path: request.path,
            method: request.method,
            query_string: request.query_string,
            browser: useragent::browser(&client.user_agent).to_string(),
            device: useragent::device(&client.user_agent),
            timestamp: OffsetDateTime::now_utc(),
        };
        self.store.append(EventRecord::Request(event.clone()))?;
        Ok(event)
    }

    /// Store a click with its dwell time unset and return a handle to complete it later.
    pub fn record_click(&self, session_id: &SessionId, document_id: &str, rank: u32, query: &str) -> Result<ClickHandle> {
        let seq = self.store.append(EventRecord::Click(ClickEvent {
            session_id: session_id.clone(),
            document_id: document_id.to_string(),
            rank,
            query: query.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            dwell_secs: None,
        }))?;
        Ok(ClickHandle(seq))
    }

    /// Fill in a click's dwell time. Only the first completion counts; later
    /// ones are logged and reported as [`DwellOutcome::AlreadyCompleted`].
    pub fn complete_dwell(&self, handle: ClickHandle, dwell_secs: f64) -> Result<DwellOutcome> {
        if !dwell_secs.is_finite() || dwell_secs < 0.0 {
            return Err(AnalyticsError::InvalidDwell(dwell_secs));
        }
        let outcome = self.store.complete_dwell(handle, dwell_secs)?;
        if outcome == DwellOutcome::AlreadyCompleted {
            tracing::warn!(%handle, dwell_secs, "dwell already completed, ignoring");
        }
        Ok(outcome)
    }

    /// Recompute dashboard statistics from the current log contents.
    pub fn compute_stats(&self, top_n: usize) -> Result<StatsSnapshot> {
        Ok(compute_stats(&self.store.snapshot()?, top_n))
    }
}
