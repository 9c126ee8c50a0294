//! Contracts for the persistence collaborators.
//!
//! The engine consumes these traits; concrete drivers (Postgres for users,
//! Redis for sessions and one-time codes) live in their own crates. Rotation
//! correctness depends on the session contract below, so its semantics are
//! pinned here rather than in any driver.

use async_trait::async_trait;
use error_types::StoreResult;
use std::time::Duration;
use uuid::Uuid;

use crate::models::User;

/// Refresh-token-keyed session storage with TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a fresh session mapping `refresh_token -> user_id`.
    async fn create(&self, user_id: Uuid, refresh_token: &str, ttl: Duration) -> StoreResult<()>;

    /// Atomically replace `old_refresh_token` with `new_refresh_token`,
    /// resetting the TTL (Redis `RENAME` + `EXPIRE` semantics). Fails with
    /// `SessionNotFound` if the old token is absent: already rotated,
    /// expired, or forged. Concurrent rotations of the same stale token must
    /// yield exactly one success.
    async fn rotate(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        ttl: Duration,
    ) -> StoreResult<()>;

    /// Resolve a refresh token to the owning user id. Fails with
    /// `SessionNotFound` if absent or expired.
    async fn resolve(&self, refresh_token: &str) -> StoreResult<Uuid>;

    /// Remove a session. Safe to repeat; reports `SessionNotFound` when
    /// there was nothing to remove so logout can distinguish the case.
    async fn delete(&self, refresh_token: &str) -> StoreResult<()>;
}

/// TTL-bound `email -> opaque value` storage. Two independent instances are
/// consumed: email-verification codes and password-reset tokens. Re-issuing
/// overwrites the previous value for that email.
#[async_trait]
pub trait OneTimeCodeStore: Send + Sync {
    async fn create(&self, email: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Fails with `CodeNotFound` if absent or expired.
    async fn read(&self, email: &str) -> StoreResult<String>;

    async fn delete(&self, email: &str) -> StoreResult<()>;
}

/// User credential/identity storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UserAlreadyExists` on a unique-constraint violation for
    /// the email.
    async fn create_user(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Uuid>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<User>;

    async fn user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Uuid, name: &str, surname: &str) -> StoreResult<()>;

    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

    async fn change_password(&self, email: &str, password_hash: &str) -> StoreResult<()>;
}
