//! Shared types for the Banyan family-tree service
//!
//! Common types used across the server and client crates: data models,
//! the unified error system, member validation rules, and utility types.

pub mod client;
pub mod error;
pub mod models;
pub mod util;
pub mod validation;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
