//! Shared types for the supplyvend storefront backend
//!
//! Common types used by the server crate: domain models, the unified
//! error system, and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResponse, AppResult};
pub use serde::{Deserialize, Serialize};
