//! Session domain
//!
//! A session is one authenticated client connection's logical identity. The
//! Gateway owns sessions; every other component only ever sees the
//! [`SessionId`] and reaches the client through the session's result channel.

pub mod entities;

pub use entities::{Session, SessionId};
