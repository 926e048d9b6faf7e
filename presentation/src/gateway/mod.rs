//! Session gateway
//!
//! Terminates client WebSocket connections, authenticates them with a
//! time-bucketed token, assigns each a session id, forwards review requests
//! onto the transport and relays everything published on the session's
//! result channel back down the socket.

pub mod auth;
pub mod protocol;
pub mod registry;
pub mod server;

pub use auth::{AuthError, TOKEN_LEN, TokenAuthority};
pub use protocol::{ClientMessage, ServerMessage, parse_client_message};
pub use registry::SessionRegistry;
pub use server::{
    AUTH_FAILED_CLOSE_CODE, GatewayState, handle_frame, router, serve, serve_on,
};
