//! Event schemas for the SSO Kafka topics.
//!
//! Payloads are versioned through a required `schema_version` field so that
//! downstream consumers can detect incompatible producers. Payloads never
//! carry password hashes or signing material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for all events.
pub const SCHEMA_VERSION: u32 = 1;

/// Topic names, one per event kind.
pub mod topics {
    pub const USER_REGISTERED: &str = "sso.auth.registered";
    pub const PASSWORD_CHANGED: &str = "sso.auth.password.changed";
    pub const VERIFICATION_CODE_UPDATED: &str = "sso.auth.code.updated";
}

/// Base envelope wrapped around every published payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event ID for idempotency and tracing.
    pub event_id: Uuid,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Schema version for compatibility checking.
    pub schema_version: u32,
    /// Source service that generated the event.
    pub source: String,
    /// Actual event payload.
    pub data: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(source: impl Into<String>, data: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            schema_version: SCHEMA_VERSION,
            source: source.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredEvent {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub surname: String,
    /// Initial email-verification code issued during registration.
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChangedEvent {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCodeUpdatedEvent {
    pub email: String,
    pub code: String,
}

/// Union of everything the SSO service publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    UserRegistered(UserRegisteredEvent),
    PasswordChanged(PasswordChangedEvent),
    VerificationCodeUpdated(VerificationCodeUpdatedEvent),
}

impl DomainEvent {
    /// Topic the event is published to.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::UserRegistered(_) => topics::USER_REGISTERED,
            DomainEvent::PasswordChanged(_) => topics::PASSWORD_CHANGED,
            DomainEvent::VerificationCodeUpdated(_) => topics::VERIFICATION_CODE_UPDATED,
        }
    }

    /// Partition key: groups events for the same principal together.
    pub fn partition_key(&self) -> String {
        match self {
            DomainEvent::UserRegistered(e) => e.user_id.to_string(),
            DomainEvent::PasswordChanged(e) => e.user_id.to_string(),
            DomainEvent::VerificationCodeUpdated(e) => e.email.clone(),
        }
    }
}
