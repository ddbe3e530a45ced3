//! Webhook HTTP server.

mod server;

pub use server::{build_app, run_gateway, AppState};
