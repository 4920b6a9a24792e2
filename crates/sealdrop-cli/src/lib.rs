//! Sealdrop gateway: a thin stateless server for opaque ciphertext
//!
//! Every route is POST, every request authenticates with the hybrid
//! dual-signature protocol, and the stored blobs are never interpreted.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
