//! Family Tree Repository

use super::{RepoError, RepoResult};
use shared::models::FamilyTree;
use sqlx::SqlitePool;

const TREE_SELECT: &str =
    "SELECT id, name, creator_id, created_at, updated_at FROM family_tree";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<FamilyTree>> {
    let sql = format!("{} WHERE id = ?", TREE_SELECT);
    let row = sqlx::query_as::<_, FamilyTree>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// All trees the user can see: created by them or joined via membership
pub async fn find_for_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<FamilyTree>> {
    let rows = sqlx::query_as::<_, FamilyTree>(
        "SELECT DISTINCT ft.id, ft.name, ft.creator_id, ft.created_at, ft.updated_at \
         FROM family_tree ft \
         LEFT JOIN membership ms ON ms.family_tree_id = ft.id AND ms.user_id = ?1 \
         WHERE ft.creator_id = ?1 OR ms.id IS NOT NULL \
         ORDER BY ft.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, name: &str, creator_id: i64) -> RepoResult<FamilyTree> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO family_tree (id, name, creator_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(id)
    .bind(name)
    .bind(creator_id)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create family tree".into()))
}
