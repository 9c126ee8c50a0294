//! Shared error taxonomy for the SSO platform.
//!
//! Every component wraps lower-level failures into one of these kinds at its
//! boundary; callers never see store- or broker-specific error values.

use thiserror::Error;

/// Caller-visible failures of the auth orchestrator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    /// Expired, reused or forged refresh token, or a failed
    /// verification/reset check.
    #[error("not authorized")]
    NotAuthorized,

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures reported by the persistence collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    /// Session absent: already rotated, expired or never created.
    #[error("session not found")]
    SessionNotFound,

    /// One-time code or reset token absent or expired.
    #[error("code not found")]
    CodeNotFound,

    #[error("storage failure: {0}")]
    Unexpected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound => AuthError::UserNotFound,
            StoreError::UserAlreadyExists => AuthError::UserAlreadyExists,
            StoreError::SessionNotFound | StoreError::CodeNotFound => AuthError::NotAuthorized,
            StoreError::Unexpected(msg) => AuthError::Unexpected(msg),
        }
    }
}
