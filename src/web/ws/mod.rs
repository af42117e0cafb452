//! WebSocket support for the live channel protocol.

pub mod live;
pub mod messages;

pub use live::live_ws_handler;
pub use messages::{ClientMessage, ServerMessage};
