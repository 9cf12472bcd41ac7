//! Authentication Handlers
//!
//! Handles register, login, and current-user lookup

use std::time::Duration;

use axum::{Json, extract::State};

use crate::AppError;
use crate::auth::{CurrentUser, password};
use crate::core::ServerState;
use crate::db::repository::{RepoError, user};
use crate::utils::ApiResponse;
use shared::ErrorCode;
use shared::client::{CurrentUserResponse, LoginRequest, LoginResponse, UserInfo};
use shared::models::UserCreate;

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// Minimum password length for new accounts
const MIN_PASSWORD_LEN: usize = 8;

/// POST /api/auth/register - 注册并自动登录
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<UserCreate>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let username = req.username.trim();
    let display_name = req.display_name.trim();

    if username.len() < 3 {
        return Err(AppError::validation(
            "Username must be at least 3 characters",
        ));
    }
    if display_name.is_empty() {
        return Err(AppError::validation("Display name is required"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }

    let password_hash = password::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = user::create(&state.pool, username, display_name, &password_hash)
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(_) => AppError::new(ErrorCode::UsernameExists),
            other => other.into(),
        })?;

    tracing::info!(username = %user.username, "User registered");

    let response = login_response(&state, user.id, &user.username, &user.display_name)?;
    Ok(ApiResponse::success(response))
}

/// POST /api/auth/login - 登录
///
/// Authenticates user credentials and returns a JWT token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let found = user::find_by_username(&state.pool, req.username.trim()).await?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Check authentication result - unified error message to prevent username enumeration
    let user = match found {
        Some(u) => {
            if !u.is_active {
                return Err(AppError::new(ErrorCode::AccountDisabled));
            }

            let password_valid = password::verify_password(&req.password, &u.password_hash)
                .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;

            if !password_valid {
                tracing::warn!(username = %req.username, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }

            u
        }
        None => {
            tracing::warn!(username = %req.username, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let response = login_response(&state, user.id, &user.username, &user.display_name)?;
    Ok(ApiResponse::success(response))
}

/// GET /api/auth/me - 当前登录用户
pub async fn me(user: CurrentUser) -> Result<ApiResponse<CurrentUserResponse>, AppError> {
    Ok(ApiResponse::success(CurrentUserResponse {
        user: UserInfo {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
        },
    }))
}

fn login_response(
    state: &ServerState,
    user_id: i64,
    username: &str,
    display_name: &str,
) -> Result<LoginResponse, AppError> {
    let jwt_service = state.get_jwt_service();
    let token = jwt_service
        .generate_token(user_id, username, display_name)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    Ok(LoginResponse {
        token,
        expires_in: jwt_service.config.expiration_minutes * 60,
        user: UserInfo {
            id: user_id,
            username: username.to_string(),
            display_name: display_name.to_string(),
        },
    })
}
