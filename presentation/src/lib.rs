//! Presentation layer for magi-quorum
//!
//! This crate contains the session gateway (WebSocket server, token
//! authentication, session registry, client protocol) and the CLI
//! definitions.

pub mod cli;
pub mod gateway;

// Re-export commonly used types
pub use cli::commands::{Cli, Command};
pub use gateway::{GatewayState, TokenAuthority};
