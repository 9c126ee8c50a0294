//! In-memory collaborators and a wired-up engine for end-to-end tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use error_types::{StoreError, StoreResult};
use sso_service::config::Config;
use sso_service::events::{BusError, Delivery, EventPublisher, MessageBus, PublisherTask};
use sso_service::keys::{KeyAuthority, KeyAuthorityTask, KeyHandle, RetryConfig};
use sso_service::models::User;
use sso_service::store::{OneTimeCodeStore, SessionStore, UserStore};
use sso_service::AuthService;

#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, (Uuid, Instant)>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: Uuid, refresh_token: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), (user_id, Instant::now() + ttl));
        Ok(())
    }

    async fn rotate(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        ttl: Duration,
    ) -> StoreResult<()> {
        // Single lock for the whole read-and-replace keeps this atomic.
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(old_refresh_token) {
            Some((user_id, expires_at)) if expires_at > Instant::now() => {
                entries.insert(new_refresh_token.to_string(), (user_id, Instant::now() + ttl));
                Ok(())
            }
            _ => Err(StoreError::SessionNotFound),
        }
    }

    async fn resolve(&self, refresh_token: &str) -> StoreResult<Uuid> {
        let entries = self.entries.lock().unwrap();
        match entries.get(refresh_token) {
            Some((user_id, expires_at)) if *expires_at > Instant::now() => Ok(*user_id),
            _ => Err(StoreError::SessionNotFound),
        }
    }

    async fn delete(&self, refresh_token: &str) -> StoreResult<()> {
        match self.entries.lock().unwrap().remove(refresh_token) {
            Some(_) => Ok(()),
            None => Err(StoreError::SessionNotFound),
        }
    }
}

#[derive(Default)]
pub struct InMemoryCodeStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

#[async_trait]
impl OneTimeCodeStore for InMemoryCodeStore {
    async fn create(&self, email: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(email.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn read(&self, email: &str) -> StoreResult<String> {
        let entries = self.entries.lock().unwrap();
        match entries.get(email) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(value.clone()),
            _ => Err(StoreError::CodeNotFound),
        }
    }

    async fn delete(&self, email: &str) -> StoreResult<()> {
        self.entries.lock().unwrap().remove(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Uuid> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::UserAlreadyExists);
        }

        let id = Uuid::new_v4();
        users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                surname: surname.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(id)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<User> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::UserNotFound)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::UserNotFound)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.lock().unwrap();
        ids.iter()
            .map(|id| users.get(id).cloned().ok_or(StoreError::UserNotFound))
            .collect()
    }

    async fn update_user(&self, id: Uuid, name: &str, surname: &str) -> StoreResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.name = name.to_string();
        user.surname = surname.to_string();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.users
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::UserNotFound)
    }

    async fn change_password(&self, email: &str, password_hash: &str) -> StoreResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .values_mut()
            .find(|u| u.email == email)
            .ok_or(StoreError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

/// Bus fake that acknowledges every message and keeps a transcript.
#[derive(Default)]
pub struct RecordingBus {
    messages: Mutex<Vec<(String, String, Vec<u8>)>>,
}

impl RecordingBus {
    /// Wait for at least `count` delivered messages and return them as
    /// `(topic, key, decoded envelope)`.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<(String, String, serde_json::Value)> {
        for _ in 0..200 {
            if self.messages.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let messages = self.messages.lock().unwrap();
        assert!(
            messages.len() >= count,
            "expected {count} bus messages, saw {}",
            messages.len()
        );
        messages
            .iter()
            .map(|(topic, key, payload)| {
                (
                    topic.clone(),
                    key.clone(),
                    serde_json::from_slice(payload).unwrap(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    fn enqueue(&self, topic: &str, key: &str, payload: &[u8]) -> Result<Delivery, BusError> {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), payload.to_vec()));
        Ok(async { Ok(()) }.boxed())
    }

    async fn close(&self) {}
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> Config {
    Config {
        access_token_ttl_secs: 300,
        refresh_token_ttl_secs: 3600,
        verification_code_ttl_secs: 300,
        reset_token_ttl_secs: 300,
        key_rotation_interval_secs: 3600,
        kafka_brokers: "localhost:9092".to_string(),
        kafka_client_id: "sso-test".to_string(),
        event_queue_capacity: 64,
    }
}

/// Fully wired engine over in-memory collaborators.
pub struct TestApp {
    pub auth: Arc<AuthService>,
    pub keys: KeyHandle,
    pub bus: Arc<RecordingBus>,
    pub access_token_ttl: Duration,
    key_task: KeyAuthorityTask,
    publisher_task: PublisherTask,
}

impl TestApp {
    pub async fn start() -> TestApp {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: Config) -> TestApp {
        init_tracing();

        let authority = KeyAuthority::new(config.key_rotation_interval(), RetryConfig::default());
        let (mut keys, key_task) = authority.spawn();
        keys.wait_available().await.expect("key authority died");

        let bus = Arc::new(RecordingBus::default());
        let (events, publisher_task) = EventPublisher::spawn(
            bus.clone(),
            config.kafka_client_id.clone(),
            config.event_queue_capacity,
        );

        let auth = Arc::new(AuthService::new(
            &config,
            Arc::new(InMemoryUserStore::default()),
            Arc::new(InMemorySessionStore::default()),
            Arc::new(InMemoryCodeStore::default()),
            Arc::new(InMemoryCodeStore::default()),
            events,
            keys.clone(),
        ));

        TestApp {
            auth,
            keys,
            bus,
            access_token_ttl: config.access_token_ttl(),
            key_task,
            publisher_task,
        }
    }

    /// Decode the claims of an access token against the current public key.
    pub fn decode_claims(&self, access_token: &str) -> sso_service::security::token::Claims {
        let keys = self.keys.latest().unwrap();
        let decoding_key =
            jsonwebtoken::DecodingKey::from_ec_pem(keys.public_key_pem().as_bytes()).unwrap();
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::ES256);
        validation.leeway = 0;
        jsonwebtoken::decode(access_token, &decoding_key, &validation)
            .unwrap()
            .claims
    }

    pub async fn shutdown(self) {
        self.key_task.stop().await;
        self.publisher_task.shutdown().await;
    }
}
