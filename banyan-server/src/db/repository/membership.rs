//! Membership Repository
//!
//! 访问控制：持有 Membership 或作为家谱创建者才能访问家谱数据。

use super::{RepoError, RepoResult};
use shared::models::Membership;
use sqlx::SqlitePool;

/// Check whether the user may access the tree (membership or creator)
pub async fn has_access(pool: &SqlitePool, tree_id: i64, user_id: i64) -> RepoResult<bool> {
    let (access,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM membership WHERE family_tree_id = ?1 AND user_id = ?2) \
             OR EXISTS(SELECT 1 FROM family_tree WHERE id = ?1 AND creator_id = ?2)",
    )
    .bind(tree_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(access)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Membership>> {
    let row = sqlx::query_as::<_, Membership>(
        "SELECT id, user_id, family_tree_id, granted_by_id, created_at FROM membership WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(
    pool: &SqlitePool,
    tree_id: i64,
    user_id: i64,
    granted_by_id: i64,
) -> RepoResult<Membership> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO membership (id, user_id, family_tree_id, granted_by_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(user_id)
    .bind(tree_id)
    .bind(granted_by_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            RepoError::Duplicate("Membership for this user and tree".into())
        }
        _ => RepoError::Database(e.to_string()),
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create membership".into()))
}
