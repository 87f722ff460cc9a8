//! HTTP API

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{build_heartbeat_router, build_router, run_server, ServerConfig};
