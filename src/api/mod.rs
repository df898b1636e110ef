//! HTTP and WebSocket server for Reality Glitcher
//!
//! Clients stream frames over `/ws` and receive gesture events; REST
//! endpoints expose status, effect enablement and gesture mappings.

pub mod routes;
pub mod server;
pub mod shared;
pub mod types;
pub mod websocket;

pub use routes::create_router;
pub use server::run_server;
pub use shared::{AppContext, AppContextHandle};
pub use types::*;
