//! Network Layer
//!
//! WebSocket server for viewers and the admin.
//! Grid rules live in `grid/`; this layer only authenticates, routes and fans out.

pub mod auth;
pub mod hub;
pub mod protocol;
pub mod server;

pub use auth::{AccessGuard, AuthConfig, AuthError, IssuedToken, TokenClaims};
pub use hub::GridHub;
pub use protocol::{ClientMessage, ErrorCode, MutationRequest, ServerError, ServerMessage};
pub use server::{GridServer, GridServerError, ServerConfig};
