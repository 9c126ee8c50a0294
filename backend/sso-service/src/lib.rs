// SSO Service Library
//
// Credential-issuance and session-lifecycle engine: authenticates users,
// issues and verifies signed tokens, rotates the signing key pair without
// interruption, and propagates one-time codes and domain events to
// collaborating services. Transport, persistence drivers and process
// bootstrap live in their own crates and plug in through the traits in
// `store`, `events` and `keys`.

pub mod config;
pub mod events;
pub mod keys;
pub mod models;
pub mod security;
pub mod services;
pub mod store;

pub use error_types::{AuthError, AuthResult, StoreError, StoreResult};
pub use models::{TokenPair, User, UserIdentity};
pub use services::AuthService;
