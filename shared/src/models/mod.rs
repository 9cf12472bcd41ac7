//! Data models
//!
//! Shared between banyan-server and the client crate (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod family_tree;
pub mod member;
pub mod membership;
pub mod user;

// Re-exports
pub use family_tree::*;
pub use member::*;
pub use membership::*;
pub use user::*;
