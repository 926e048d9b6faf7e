//! Client wire protocol
//!
//! Inbound frames are JSON objects with a `type` field. Decoding never fails
//! hard: anything that is not a recognized, well-formed message becomes
//! [`ClientMessage::Unsupported`] or [`ClientMessage::Invalid`] so the
//! connection can reply inline and keep going.

use magi_domain::{RequestId, SessionId};
use serde::Serialize;
use serde_json::Value;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Ping,
    ReviewRequest { payload: String },
    /// Well-formed frame with an unknown `type`
    Unsupported(String),
    /// Not JSON, no `type`, or missing required fields
    Invalid,
}

pub fn parse_client_message(text: &str) -> ClientMessage {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return ClientMessage::Invalid;
    };
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return ClientMessage::Invalid;
    };

    match kind {
        "ping" => ClientMessage::Ping,
        "review_request" | "agent_judgement" => match value.get("payload") {
            Some(Value::String(payload)) => ClientMessage::ReviewRequest {
                payload: payload.clone(),
            },
            _ => ClientMessage::Invalid,
        },
        other => ClientMessage::Unsupported(other.to_string()),
    }
}

/// Frames the gateway originates itself.
///
/// Results relayed from the session channel are forwarded verbatim and never
/// pass through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Typed(TypedFrame),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedFrame {
    ConnectionConfirmed { session_id: SessionId },
    Pong,
    RequestAccepted { request_id: RequestId },
}

impl ServerMessage {
    pub fn connection_confirmed(session_id: SessionId) -> Self {
        ServerMessage::Typed(TypedFrame::ConnectionConfirmed { session_id })
    }

    pub fn pong() -> Self {
        ServerMessage::Typed(TypedFrame::Pong)
    }

    pub fn request_accepted(request_id: RequestId) -> Self {
        ServerMessage::Typed(TypedFrame::RequestAccepted { request_id })
    }

    pub fn unsupported() -> Self {
        ServerMessage::Error {
            error: "unsupported message type".to_string(),
        }
    }

    pub fn invalid_format() -> Self {
        ServerMessage::Error {
            error: "invalid format".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        ServerMessage::Error {
            error: "service unavailable".to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
    }
}
