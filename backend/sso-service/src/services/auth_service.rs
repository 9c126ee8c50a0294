//! Auth orchestrator: composes the token codec, key handoff, session and
//! one-time-code stores and the event pipeline into the caller-facing
//! operations.
//!
//! Operations run as best-effort sequential steps: a failing step aborts
//! with its mapped error and earlier steps are not compensated. Key-rotation
//! and event-publish failures never fail an otherwise-successful operation.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use error_types::{AuthError, AuthResult};
use event_schema::{
    DomainEvent, PasswordChangedEvent, UserRegisteredEvent, VerificationCodeUpdatedEvent,
};

use crate::config::Config;
use crate::events::EventPublisher;
use crate::keys::KeyHandle;
use crate::models::{TokenPair, User, UserIdentity};
use crate::security::{password, token};
use crate::store::{OneTimeCodeStore, SessionStore, UserStore};

pub struct AuthService {
    user_store: Arc<dyn UserStore>,
    session_store: Arc<dyn SessionStore>,
    verification_codes: Arc<dyn OneTimeCodeStore>,
    reset_tokens: Arc<dyn OneTimeCodeStore>,
    events: EventPublisher,
    keys: KeyHandle,

    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    verification_code_ttl: Duration,
    reset_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        config: &Config,
        user_store: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        verification_codes: Arc<dyn OneTimeCodeStore>,
        reset_tokens: Arc<dyn OneTimeCodeStore>,
        events: EventPublisher,
        keys: KeyHandle,
    ) -> Self {
        Self {
            user_store,
            session_store,
            verification_codes,
            reset_tokens,
            events,
            keys,
            access_token_ttl: config.access_token_ttl(),
            refresh_token_ttl: config.refresh_token_ttl(),
            verification_code_ttl: config.verification_code_ttl(),
            reset_token_ttl: config.reset_token_ttl(),
        }
    }

    /// Create a credential, open a session and issue the first verification
    /// code for a new user.
    pub async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<TokenPair> {
        info!(email, "registering user");

        let password_hash = password::hash_password(password)?;

        let user_id = self
            .user_store
            .create_user(name, surname, email, &password_hash)
            .await?;

        let identity = UserIdentity {
            id: user_id,
            name: name.to_string(),
            surname: surname.to_string(),
        };
        let tokens = self.issue_tokens(&identity)?;

        self.session_store
            .create(user_id, &tokens.refresh_token, self.refresh_token_ttl)
            .await?;

        let code = generate_verification_code();
        self.verification_codes
            .create(email, &code, self.verification_code_ttl)
            .await?;

        self.emit(DomainEvent::UserRegistered(UserRegisteredEvent {
            user_id,
            email: email.to_string(),
            name: name.to_string(),
            surname: surname.to_string(),
            code,
        }));

        Ok(tokens)
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        info!(email, "logging in user");

        let user = self.user_store.user_by_email(email).await?;
        password::verify_password(password, &user.password_hash)?;

        let tokens = self.issue_tokens(&user.identity())?;
        self.session_store
            .create(user.id, &tokens.refresh_token, self.refresh_token_ttl)
            .await?;

        Ok(tokens)
    }

    /// Delete the session; an absent session means the caller never was, or
    /// no longer is, authorized.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        self.session_store.delete(refresh_token).await?;
        Ok(())
    }

    /// Replay-defense core: the old refresh token is atomically replaced, so
    /// reuse of an already-rotated token always fails.
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let user_id = self.session_store.resolve(refresh_token).await?;
        let user = self.user_store.user_by_id(user_id).await?;

        let tokens = self.issue_tokens(&user.identity())?;

        self.session_store
            .rotate(refresh_token, &tokens.refresh_token, self.refresh_token_ttl)
            .await?;

        Ok(tokens)
    }

    pub async fn get_user(&self, id: Uuid) -> AuthResult<User> {
        Ok(self.user_store.user_by_id(id).await?)
    }

    pub async fn get_users(&self, ids: &[Uuid]) -> AuthResult<Vec<User>> {
        Ok(self.user_store.users_by_ids(ids).await?)
    }

    pub async fn update_user(&self, id: Uuid, name: &str, surname: &str) -> AuthResult<()> {
        self.user_store.update_user(id, name, surname).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: Uuid) -> AuthResult<()> {
        self.user_store.delete_user(id).await?;
        Ok(())
    }

    /// Issue a fresh verification code for the user's email, overwriting any
    /// previous one.
    pub async fn send_verification_email(&self, email: &str) -> AuthResult<()> {
        info!(email, "issuing verification code");

        self.user_store.user_by_email(email).await?;

        let code = generate_verification_code();
        self.verification_codes
            .create(email, &code, self.verification_code_ttl)
            .await?;

        self.emit(DomainEvent::VerificationCodeUpdated(
            VerificationCodeUpdatedEvent {
                email: email.to_string(),
                code,
            },
        ));

        Ok(())
    }

    /// Single-use check: the stored code is deleted on the first successful
    /// match.
    pub async fn verify_email(&self, email: &str, code: &str) -> AuthResult<()> {
        let stored = self.verification_codes.read(email).await?;
        if stored != code {
            return Err(AuthError::NotAuthorized);
        }
        self.verification_codes.delete(email).await?;

        info!(email, "email verified");
        Ok(())
    }

    pub async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        info!(email, "issuing password reset token");

        self.user_store.user_by_email(email).await?;

        let reset_token = Uuid::new_v4().to_string();
        self.reset_tokens
            .create(email, &reset_token, self.reset_token_ttl)
            .await?;

        self.emit(DomainEvent::VerificationCodeUpdated(
            VerificationCodeUpdatedEvent {
                email: email.to_string(),
                code: reset_token,
            },
        ));

        Ok(())
    }

    pub async fn change_password(
        &self,
        email: &str,
        reset_token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let stored = self.reset_tokens.read(email).await?;
        if stored != reset_token {
            return Err(AuthError::NotAuthorized);
        }

        let user = self.user_store.user_by_email(email).await?;

        let password_hash = password::hash_password(new_password)?;
        self.user_store.change_password(email, &password_hash).await?;
        self.reset_tokens.delete(email).await?;

        self.emit(DomainEvent::PasswordChanged(PasswordChangedEvent {
            user_id: user.id,
            email: email.to_string(),
        }));

        info!(email, "password changed");
        Ok(())
    }

    fn issue_tokens(&self, identity: &UserIdentity) -> AuthResult<TokenPair> {
        let keys = self
            .keys
            .latest()
            .ok_or_else(|| AuthError::Unexpected("signing keys not yet available".to_string()))?;

        token::issue(identity, self.access_token_ttl, &keys)
            .map_err(|err| AuthError::Unexpected(format!("failed to sign access token: {err}")))
    }

    /// Enqueue a domain event; a full queue or stopped pipeline is logged
    /// and must not fail the calling operation.
    fn emit(&self, event: DomainEvent) {
        if let Err(err) = self.events.publish(event) {
            warn!(error = %err, "failed to enqueue domain event");
        }
    }
}

fn generate_verification_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}
