//! Image Serving Handler
//!
//! Serves uploaded images from the work directory.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::core::ServerState;
use crate::utils::AppError;

/// Reject path components that could escape the images directory
fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && !s.contains("..")
        && !s.contains('/')
        && !s.contains('\\')
}

/// GET /api/image/:folder/:file - 获取已上传的图片
pub async fn serve(
    State(state): State<ServerState>,
    Path((folder, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if !is_safe_component(&folder) || !is_safe_component(&file) {
        return Err(AppError::invalid("Invalid image path"));
    }

    let path = state.config.images_dir().join(&folder).join(&file);

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("Image {folder}/{file}")));
        }
        Err(e) => {
            return Err(AppError::internal(format!("Failed to read image: {e}")));
        }
    };

    let mime = mime_guess::from_path(&file).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        data,
    )
        .into_response())
}
