//! Family Tree API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::require_tree_access;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{RepoError, family_tree, membership, user};
use crate::utils::{AppError, AppResult};
use shared::ErrorCode;
use shared::models::{FamilyTree, FamilyTreeCreate, Membership, MembershipCreate};

/// GET /api/family-trees - 当前用户可见的家谱
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<FamilyTree>>> {
    let trees = family_tree::find_for_user(&state.pool, current_user.id).await?;
    Ok(Json(trees))
}

/// GET /api/family-trees/:id - 获取单个家谱
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(tree_id): Path<i64>,
) -> AppResult<Json<FamilyTree>> {
    require_tree_access(&state, tree_id, &current_user).await?;

    let tree = family_tree::find_by_id(&state.pool, tree_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::FamilyTreeNotFound))?;
    Ok(Json(tree))
}

/// POST /api/family-trees - 创建家谱 (调用者成为创建者)
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<FamilyTreeCreate>,
) -> AppResult<Json<FamilyTree>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Family tree name is required"));
    }

    let tree = family_tree::create(&state.pool, name, current_user.id).await?;
    tracing::info!(tree_id = tree.id, creator = %current_user.username, "Family tree created");
    Ok(Json(tree))
}

/// POST /api/family-trees/:id/memberships - 按用户名授予访问权
///
/// 仅创建者可以授权
pub async fn add_membership(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(tree_id): Path<i64>,
    Json(payload): Json<MembershipCreate>,
) -> AppResult<Json<Membership>> {
    let tree = family_tree::find_by_id(&state.pool, tree_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::FamilyTreeNotFound))?;

    if tree.creator_id != current_user.id {
        return Err(AppError::forbidden(
            "Only the tree creator can grant memberships",
        ));
    }

    let grantee = user::find_by_username(&state.pool, payload.username.trim())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let membership = membership::create(&state.pool, tree_id, grantee.id, current_user.id)
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(_) => AppError::new(ErrorCode::MembershipExists),
            other => other.into(),
        })?;

    Ok(Json(membership))
}
