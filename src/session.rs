//! Session storage for loaded tables and accumulated results.
//!
//! A session holds one loaded [`Table`] and every [`GroupResult`] produced
//! against it. Results are appended, never replaced, so charts from several
//! requests can be exported together. Stale sessions are removed by an
//! injected [`EvictionPolicy`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::engine::GroupResult;
use crate::error::SessionError;
use crate::table::Table;

/// Default idle time after which a session expires: 1 hour.
pub const DEFAULT_MAX_IDLE: Duration = Duration::hours(1);

/// Strips every character that is not alphanumeric or `_`.
///
/// # Examples
///
/// ```
/// use u_spc_trace::session::sanitize_session_id;
///
/// assert_eq!(sanitize_session_id("1712.55/../x"), "171255x");
/// ```
pub fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Decides whether a session is stale.
pub trait EvictionPolicy: Send + Sync {
    fn is_expired(&self, last_touched: DateTime<Utc>, now: DateTime<Utc>) -> bool;
}

/// Expires sessions idle for longer than `max_idle`.
#[derive(Debug, Clone, Copy)]
pub struct TtlEviction {
    pub max_idle: Duration,
}

impl Default for TtlEviction {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

impl EvictionPolicy for TtlEviction {
    fn is_expired(&self, last_touched: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_touched > self.max_idle
    }
}

/// Never expires anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEviction;

impl EvictionPolicy for NoEviction {
    fn is_expired(&self, _last_touched: DateTime<Utc>, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Storage for per-session tables and results.
///
/// Implementations must serialize mutations of one session; distinct
/// sessions must not share mutable state.
pub trait SessionStore: Send + Sync {
    /// Creates an empty session, keeping an existing one untouched.
    fn create(&self, session_id: &str);

    /// Stores a table, replacing any previous table and clearing results.
    fn put_table(&self, session_id: &str, table: Table);

    /// The session's table.
    fn table(&self, session_id: &str) -> Result<Arc<Table>, SessionError>;

    /// Appends results; returns the session's new result count.
    fn append_results(
        &self,
        session_id: &str,
        results: Vec<GroupResult>,
    ) -> Result<usize, SessionError>;

    /// All results accumulated so far, in append order.
    fn results(&self, session_id: &str) -> Result<Vec<GroupResult>, SessionError>;

    /// Drops the accumulated results, keeping the table.
    fn clear_results(&self, session_id: &str) -> Result<(), SessionError>;

    /// Removes the session. Returns false if it did not exist.
    fn remove(&self, session_id: &str) -> bool;

    /// Removes every session the eviction policy considers stale at `now`.
    fn evict_expired(&self, now: DateTime<Utc>) -> usize;
}

#[derive(Debug, Clone)]
struct SessionEntry {
    table: Option<Arc<Table>>,
    results: Vec<GroupResult>,
    touched_at: DateTime<Utc>,
}

impl SessionEntry {
    fn empty() -> Self {
        Self {
            table: None,
            results: Vec::new(),
            touched_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.touched_at = Utc::now();
    }
}

/// In-process [`SessionStore`] backed by `DashMap`.
///
/// Each session lives in one shard entry, so appends to the same session
/// are serialized by the entry lock while other sessions proceed.
pub struct InMemorySessionStore<P: EvictionPolicy = TtlEviction> {
    sessions: Arc<DashMap<String, SessionEntry>>,
    policy: P,
}

impl InMemorySessionStore<TtlEviction> {
    /// Store with the default one-hour idle expiry.
    pub fn new() -> Self {
        Self::with_policy(TtlEviction::default())
    }
}

impl Default for InMemorySessionStore<TtlEviction> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: EvictionPolicy> InMemorySessionStore<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            policy,
        }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// All session identifiers.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    #[cfg(test)]
    fn backdate(&self, session_id: &str, by: Duration) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.touched_at -= by;
        }
    }
}

impl<P: EvictionPolicy> SessionStore for InMemorySessionStore<P> {
    fn create(&self, session_id: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::empty);
    }

    fn put_table(&self, session_id: &str, table: Table) {
        debug!(session_id, rows = table.len(), "table stored");
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::empty);
        entry.table = Some(Arc::new(table));
        entry.results.clear();
        entry.touch();
    }

    fn table(&self, session_id: &str) -> Result<Arc<Table>, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.touch();
        entry
            .table
            .clone()
            .ok_or_else(|| SessionError::NoTable(session_id.to_string()))
    }

    fn append_results(
        &self,
        session_id: &str,
        results: Vec<GroupResult>,
    ) -> Result<usize, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.results.extend(results);
        entry.touch();
        Ok(entry.results.len())
    }

    fn results(&self, session_id: &str) -> Result<Vec<GroupResult>, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.touch();
        if entry.results.is_empty() {
            return Err(SessionError::NoResults(session_id.to_string()));
        }
        Ok(entry.results.clone())
    }

    fn clear_results(&self, session_id: &str) -> Result<(), SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.results.clear();
        entry.touch();
        Ok(())
    }

    fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| !self.policy.is_expired(entry.touched_at, now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, "expired sessions evicted");
        }
        removed
    }
}
