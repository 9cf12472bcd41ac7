//! Unified error codes for the Banyan service
//!
//! This module defines all error codes used across banyan-server and the
//! client crate. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Family tree errors
//! - 4xxx: Member errors
//! - 5xxx: File upload errors
//! - 6xxx: User errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1005,
    /// Password too short
    PasswordTooShort = 1006,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Family Tree ====================
    /// Family tree not found
    FamilyTreeNotFound = 3001,
    /// Membership already exists for this user and tree
    MembershipExists = 3002,

    // ==================== 4xxx: Member ====================
    /// Member not found
    MemberNotFound = 4001,

    // ==================== 5xxx: File Upload ====================
    /// File too large
    FileTooLarge = 5001,
    /// Unsupported file format
    UnsupportedFileFormat = 5002,
    /// Invalid/corrupted image file
    InvalidImageFile = 5003,
    /// No file provided in request
    NoFileProvided = 5004,
    /// Empty file provided
    EmptyFile = 5005,
    /// No filename provided
    NoFilename = 5006,
    /// Invalid file extension
    InvalidFileExtension = 5007,
    /// Image processing failed
    ImageProcessingFailed = 5008,
    /// File storage failed
    FileStorageFailed = 5009,

    // ==================== 6xxx: User ====================
    /// User not found
    UserNotFound = 6001,
    /// Username already exists
    UsernameExists = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",

            Self::NotAuthenticated => "Please login first",
            Self::InvalidCredentials => "Invalid username or password",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::AccountDisabled => "Account has been disabled",
            Self::PasswordTooShort => "Password is too short",

            Self::PermissionDenied => "Permission denied",

            Self::FamilyTreeNotFound => "Family tree not found",
            Self::MembershipExists => "Membership already exists",

            Self::MemberNotFound => "Member not found",

            Self::FileTooLarge => "File too large",
            Self::UnsupportedFileFormat => "Unsupported file format",
            Self::InvalidImageFile => "Invalid image file",
            Self::NoFileProvided => "No file provided",
            Self::EmptyFile => "Empty file provided",
            Self::NoFilename => "No filename provided",
            Self::InvalidFileExtension => "Invalid file extension",
            Self::ImageProcessingFailed => "Image processing failed",
            Self::FileStorageFailed => "File storage failed",

            Self::UserNotFound => "User not found",
            Self::UsernameExists => "Username already exists",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Network error",
        }
    }

    /// Get the HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::PasswordTooShort
            | Self::FileTooLarge
            | Self::UnsupportedFileFormat
            | Self::InvalidImageFile
            | Self::NoFileProvided
            | Self::EmptyFile
            | Self::NoFilename
            | Self::InvalidFileExtension => StatusCode::BAD_REQUEST,

            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            Self::PermissionDenied | Self::AccountDisabled => StatusCode::FORBIDDEN,

            Self::NotFound
            | Self::FamilyTreeNotFound
            | Self::MemberNotFound
            | Self::UserNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists | Self::MembershipExists | Self::UsernameExists => {
                StatusCode::CONFLICT
            }

            Self::Unknown
            | Self::ImageProcessingFailed
            | Self::FileStorageFailed
            | Self::InternalError
            | Self::DatabaseError
            | Self::NetworkError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 value does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::InvalidFormat,

            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,
            1003 => Self::TokenExpired,
            1004 => Self::TokenInvalid,
            1005 => Self::AccountDisabled,
            1006 => Self::PasswordTooShort,

            2001 => Self::PermissionDenied,

            3001 => Self::FamilyTreeNotFound,
            3002 => Self::MembershipExists,

            4001 => Self::MemberNotFound,

            5001 => Self::FileTooLarge,
            5002 => Self::UnsupportedFileFormat,
            5003 => Self::InvalidImageFile,
            5004 => Self::NoFileProvided,
            5005 => Self::EmptyFile,
            5006 => Self::NoFilename,
            5007 => Self::InvalidFileExtension,
            5008 => Self::ImageProcessingFailed,
            5009 => Self::FileStorageFailed,

            6001 => Self::UserNotFound,
            6002 => Self::UsernameExists,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::NetworkError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotAuthenticated,
            ErrorCode::PermissionDenied,
            ErrorCode::FamilyTreeNotFound,
            ErrorCode::MemberNotFound,
            ErrorCode::FileTooLarge,
            ErrorCode::UsernameExists,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::MemberNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::NotAuthenticated).unwrap();
        assert_eq!(json, "1001");
        let code: ErrorCode = serde_json::from_str("2001").unwrap();
        assert_eq!(code, ErrorCode::PermissionDenied);
    }
}
