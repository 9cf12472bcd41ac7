//! Member API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::require_tree_access;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::member;
use crate::utils::{AppError, AppResult};
use shared::ErrorCode;
use shared::models::{MemberPayload, MemberWithChildren};

/// GET /api/family-trees/:id/members - 获取家谱全部成员
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(tree_id): Path<i64>,
) -> AppResult<Json<Vec<MemberWithChildren>>> {
    require_tree_access(&state, tree_id, &current_user).await?;

    let members = member::find_by_tree(&state.pool, tree_id).await?;
    Ok(Json(members))
}

/// GET /api/family-trees/:id/members/:member_id - 获取单个成员
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path((tree_id, member_id)): Path<(i64, i64)>,
) -> AppResult<Json<MemberWithChildren>> {
    require_tree_access(&state, tree_id, &current_user).await?;

    let member = member::find_by_id_in_tree(&state.pool, tree_id, member_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::MemberNotFound, format!("Member {member_id} not found"))
        })?;
    Ok(Json(member))
}

/// POST /api/family-trees/:id/members - 创建成员
///
/// 校验全部业务规则后在一个事务内写入成员、配偶回链和父母的子女集合。
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(tree_id): Path<i64>,
    Json(payload): Json<MemberPayload>,
) -> AppResult<Json<MemberWithChildren>> {
    require_tree_access(&state, tree_id, &current_user).await?;

    let today = chrono::Utc::now().date_naive();
    let created =
        member::create(&state.pool, tree_id, current_user.id, &payload, today).await?;

    tracing::info!(
        tree_id,
        member_id = created.member.id,
        operator = %current_user.username,
        "Member created"
    );

    Ok(Json(created))
}

/// PUT /api/family-trees/:id/members/:member_id - 更新成员
///
/// 与创建同样的校验和事务边界；配偶关系变更时维护双向引用。
pub async fn update(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path((tree_id, member_id)): Path<(i64, i64)>,
    Json(payload): Json<MemberPayload>,
) -> AppResult<Json<MemberWithChildren>> {
    require_tree_access(&state, tree_id, &current_user).await?;

    let today = chrono::Utc::now().date_naive();
    let updated = member::update(
        &state.pool,
        tree_id,
        member_id,
        current_user.id,
        &payload,
        today,
    )
    .await?;

    tracing::info!(
        tree_id,
        member_id,
        operator = %current_user.username,
        "Member updated"
    );

    Ok(Json(updated))
}
