//! Session domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of every per-session result channel.
const RESULT_CHANNEL_PREFIX: &str = "session:results:";

/// Opaque session identifier (Value Object)
///
/// Format: `session-{app_id}-{unix_secs}-{suffix}`. The suffix is random so two
/// connections of the same app within the same second still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for `app_id` at time `now`.
    pub fn generate(app_id: &str, now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "session-{}-{}-{}",
            app_id,
            now.timestamp(),
            &suffix[..12]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the pub/sub channel results for this session are published on.
    pub fn result_channel(&self) -> String {
        format!("{}{}", RESULT_CHANNEL_PREFIX, self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated client session (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    /// The app id the client authenticated with
    pub client_identity: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Open a new session for an authenticated client identity.
    pub fn open(client_identity: impl Into<String>, now: DateTime<Utc>) -> Self {
        let client_identity = client_identity.into();
        Self {
            session_id: SessionId::generate(&client_identity, now),
            client_identity,
            created_at: now,
        }
    }

    /// Replace the identifier (used by the Gateway when a generated id collides).
    pub fn regenerate_id(&mut self, now: DateTime<Utc>) {
        self.session_id = SessionId::generate(&self.client_identity, now);
    }
}
