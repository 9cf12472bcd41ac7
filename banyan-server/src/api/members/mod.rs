//! Member API 模块
//!
//! 成员接口全部嵌套在所属家谱之下；访问前先做家谱权限检查。

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/family-trees/{tree_id}/members", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{member_id}", get(handler::get_by_id).put(handler::update))
}
