//! Banyan Client - HTTP client for the Banyan family-tree server
//!
//! Provides network-based HTTP calls to the server API, plus the member
//! edit-form state machine ([`form::MemberForm`]) and its async driver
//! ([`editor::MemberEditor`]) used by front-end shells.

pub mod config;
pub mod editor;
pub mod error;
pub mod form;
pub mod http;

pub use config::ClientConfig;
pub use editor::{MemberEditor, SubmitOutcome};
pub use error::{ClientError, ClientResult};
pub use form::{FormState, ImageAttachment, LoadTicket, MemberForm, Notice};
pub use http::HttpClient;

// Re-export shared types for convenience
pub use shared::client::{
    CurrentUserResponse, LoginResponse, UploadResponse, UserInfo,
};
pub use shared::error::ApiResponse;
