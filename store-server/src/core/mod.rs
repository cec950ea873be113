//! Core server plumbing: configuration and shared state

pub mod state;

pub use crate::config::Config;
pub use state::ServerState;
