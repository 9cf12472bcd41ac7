//! Membership Model

use serde::{Deserialize, Serialize};

/// Membership entity (家谱访问授权)
///
/// Grants a user access to a family tree. Unique per (user, tree) pair;
/// the tree creator has access without a membership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub family_tree_id: i64,
    pub granted_by_id: i64,
    pub created_at: i64,
}

/// Grant membership payload (by username)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCreate {
    pub username: String,
}
