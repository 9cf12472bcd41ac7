//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 认证相关接口 (注册/登录/当前用户)
//! - [`upload`] - 图片上传接口
//! - [`image`] - 图片直链
//! - [`family_trees`] - 家谱管理接口
//! - [`members`] - 家谱成员管理接口

pub mod auth;
pub mod family_trees;
pub mod health;
pub mod image;
pub mod members;
pub mod upload;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::membership;
use crate::utils::{AppError, AppResult};

/// 家谱访问检查：持有 Membership 或作为创建者
///
/// 无权限返回 403；家谱不存在时同样表现为无权限。
pub(crate) async fn require_tree_access(
    state: &ServerState,
    tree_id: i64,
    user: &CurrentUser,
) -> AppResult<()> {
    if membership::has_access(&state.pool, tree_id, user.id).await? {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "No access to family tree {tree_id}"
        )))
    }
}
