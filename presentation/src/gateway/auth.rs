//! Time-bucketed shared-secret authentication.
//!
//! A client token is the first [`TOKEN_LEN`] hex characters of
//! `SHA-256(app_id ‖ secret ‖ bucket)` where `bucket = floor(unix_secs / window)`.
//! Tokens from the current and the immediately preceding bucket are accepted.
//! Nothing is stored: verification is a pure function of time and secret.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of hex characters in a token
pub const TOKEN_LEN: usize = 10;

/// Authentication failures (mapped to a dedicated WebSocket close code)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing app_id or token")]
    MissingCredentials,

    #[error("invalid or expired token")]
    InvalidToken,
}

#[derive(Debug, Clone)]
pub struct TokenAuthority {
    secret: String,
    window_secs: i64,
}

impl TokenAuthority {
    pub fn new(secret: impl Into<String>, window_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            window_secs: i64::try_from(window_secs.max(1)).unwrap_or(i64::MAX),
        }
    }

    /// The bucket `now` falls into.
    pub fn bucket(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.window_secs)
    }

    /// Token for `app_id` in a given bucket.
    pub fn token_for(&self, app_id: &str, bucket: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(app_id.as_bytes());
        hasher.update(self.secret.as_bytes());
        hasher.update(bucket.to_string().as_bytes());
        let mut token = hex::encode(hasher.finalize());
        token.truncate(TOKEN_LEN);
        token
    }

    /// Token a client would present right now.
    pub fn current_token(&self, app_id: &str, now: DateTime<Utc>) -> String {
        self.token_for(app_id, self.bucket(now))
    }

    pub fn verify(&self, app_id: &str, token: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        if app_id.is_empty() || token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let bucket = self.bucket(now);
        if [bucket, bucket - 1]
            .iter()
            .any(|b| self.token_for(app_id, *b) == token)
        {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}
