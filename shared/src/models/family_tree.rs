//! Family Tree Model

use serde::{Deserialize, Serialize};

/// Family tree entity (家谱)
///
/// Top-level container owning a set of members and memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FamilyTree {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create family tree payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyTreeCreate {
    pub name: String,
}
