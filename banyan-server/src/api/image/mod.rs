//! Image API 模块 (图片直链，公共路由)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/image/{folder}/{file}", get(handler::serve))
}
