//! Session store
//!
//! Tracks the handshake state of every client connected to one server
//! instance. The map is the only state shared between concurrent requests and
//! sits behind a single mutex; sessions carry no cross-session invariant.

use crate::error::SessionError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// One client's negotiated connection
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque server-generated identifier
    pub id: String,

    /// Set once the client sends `notifications/initialized`
    pub ready: bool,

    /// When the session was created
    pub created_at: Instant,

    /// Last time the session was looked up
    pub last_activity: Instant,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            ready: false,
            created_at: now,
            last_activity: now,
        }
    }
}

/// Process-wide session table for one server
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, not-yet-ready session.
    pub fn create(&self) -> Session {
        let session = Session::new(Uuid::new_v4().simple().to_string());
        self.sessions
            .lock()
            .insert(session.id.clone(), session.clone());
        debug!(session_id = %session.id, "Session created");
        session
    }

    /// Look up a session, refreshing its `last_activity`.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(session_id)?;
        session.last_activity = Instant::now();
        Some(session.clone())
    }

    /// Mark a session ready. Idempotent.
    pub fn mark_ready(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::Unknown(session_id.to_string()))?;
        if !session.ready {
            debug!(session_id, "Session ready");
        }
        session.ready = true;
        session.last_activity = Instant::now();
        Ok(())
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Keep only the sessions matching `keep`; returns how many were dropped.
    ///
    /// Hook for an eviction policy (e.g. an idle sweep on `last_activity`).
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&Session) -> bool,
    {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| keep(session));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
