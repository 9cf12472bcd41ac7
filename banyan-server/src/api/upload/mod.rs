//! Upload API 模块

mod handler;

use axum::{Router, extract::DefaultBodyLimit, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/upload/{folder}", post(handler::upload))
        // 5MB 图片 + multipart 开销
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
}
