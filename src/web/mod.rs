//! Web layer for newswire.
//!
//! Poll endpoint, privileged refresh, and the live channel protocol.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod ws;

pub use handlers::AppState;
pub use router::create_router;
