//! Messages exchanged over the transport fabric
//!
//! - [`QueueMessage`]: work-queue envelopes; the topic is derived from the kind
//! - [`SessionEvent`]: terminal messages published to a session's channel

pub mod envelope;
pub mod session_event;

pub use envelope::{QueueMessage, topics};
pub use session_event::{ReviewErrorKind, SessionEvent};
