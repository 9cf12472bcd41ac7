//! HTTP client for network-based API calls

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{ApiResponse, ClientConfig, ClientError, ClientResult};
use shared::client::{CurrentUserResponse, LoginRequest, LoginResponse, UploadResponse};
use shared::models::{
    FamilyTree, FamilyTreeCreate, MemberPayload, MemberWithChildren, Membership,
    MembershipCreate, UserCreate,
};

/// HTTP client for making network requests to the Banyan server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the token in place (e.g. after login)
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.put(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    ///
    /// Error bodies use the `ApiResponse` envelope; its message is surfaced
    /// so the user sees what the server reported.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiResponse<()>>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(message)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(message)),
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                    Err(ClientError::Validation(message))
                }
                _ => Err(ClientError::Internal(message)),
            };
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Auth API ==========

    /// Register a new account and store the returned token
    pub async fn register(
        &mut self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> ClientResult<LoginResponse> {
        let request = UserCreate {
            username: username.to_string(),
            display_name: display_name.to_string(),
            password: password.to_string(),
        };

        let login = self
            .post::<ApiResponse<LoginResponse>, _>("/api/auth/register", &request)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing register data".to_string()))?;

        self.token = Some(login.token.clone());
        Ok(login)
    }

    /// Login with username and password, storing the returned token
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let login = self
            .post::<ApiResponse<LoginResponse>, _>("/api/auth/login", &request)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing login data".to_string()))?;

        self.token = Some(login.token.clone());
        Ok(login)
    }

    /// Get current user information
    pub async fn me(&self) -> ClientResult<CurrentUserResponse> {
        self.get::<ApiResponse<CurrentUserResponse>>("/api/auth/me")
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing user data".to_string()))
    }

    // ========== Family Tree API ==========

    /// List family trees visible to the current user
    pub async fn list_trees(&self) -> ClientResult<Vec<FamilyTree>> {
        self.get("/api/family-trees").await
    }

    /// Create a family tree
    pub async fn create_tree(&self, name: &str) -> ClientResult<FamilyTree> {
        self.post(
            "/api/family-trees",
            &FamilyTreeCreate {
                name: name.to_string(),
            },
        )
        .await
    }

    /// Grant tree access to another user by username
    pub async fn add_membership(&self, tree_id: i64, username: &str) -> ClientResult<Membership> {
        self.post(
            &format!("/api/family-trees/{tree_id}/memberships"),
            &MembershipCreate {
                username: username.to_string(),
            },
        )
        .await
    }

    // ========== Member API ==========

    /// List all members of a tree
    pub async fn list_members(&self, tree_id: i64) -> ClientResult<Vec<MemberWithChildren>> {
        self.get(&format!("/api/family-trees/{tree_id}/members"))
            .await
    }

    /// Fetch a single member
    pub async fn get_member(
        &self,
        tree_id: i64,
        member_id: i64,
    ) -> ClientResult<MemberWithChildren> {
        self.get(&format!("/api/family-trees/{tree_id}/members/{member_id}"))
            .await
    }

    /// Create a member
    pub async fn create_member(
        &self,
        tree_id: i64,
        payload: &MemberPayload,
    ) -> ClientResult<MemberWithChildren> {
        self.post(&format!("/api/family-trees/{tree_id}/members"), payload)
            .await
    }

    /// Update a member
    pub async fn update_member(
        &self,
        tree_id: i64,
        member_id: i64,
        payload: &MemberPayload,
    ) -> ClientResult<MemberWithChildren> {
        self.put(
            &format!("/api/family-trees/{tree_id}/members/{member_id}"),
            payload,
        )
        .await
    }

    // ========== Upload API ==========

    /// Upload an image into a logical folder, returning its URL
    pub async fn upload_image(
        &self,
        folder: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<UploadResponse> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .client
            .post(self.url(&format!("/api/upload/{folder}")))
            .multipart(form);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response::<ApiResponse<UploadResponse>>(response)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing upload data".to_string()))
    }
}
