//! Live session registry
//!
//! Owned by the gateway alone. Other components only ever see a
//! [`SessionId`]; they reach a client through its result channel.

use chrono::{DateTime, Utc};
use magi_domain::{Session, SessionId};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and register a session for `client_identity`.
    ///
    /// The generated id is regenerated until it does not collide with a
    /// live session.
    pub fn register(&self, client_identity: &str, now: DateTime<Utc>) -> Session {
        let mut session = Session::open(client_identity, now);
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        while sessions.contains_key(&session.session_id) {
            session.regenerate_id(now);
        }
        sessions.insert(session.session_id.clone(), session.clone());
        session
    }

    pub fn unregister(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
