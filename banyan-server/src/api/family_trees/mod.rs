//! Family Tree API 模块

mod handler;

use axum::{Router, routing::{get, post}};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/family-trees", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{tree_id}", get(handler::get_by_id))
        .route("/{tree_id}/memberships", post(handler::add_membership))
}
