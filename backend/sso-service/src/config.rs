/// Configuration management
use serde::Deserialize;
use std::time::Duration;

fn default_kafka_client_id() -> String {
    "sso-service".to_string()
}

fn default_event_queue_capacity() -> usize {
    256
}

/// Configuration surface consumed by the engine. All durations are opaque
/// second counts; the process bootstrap owns how they are sourced.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub verification_code_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    pub key_rotation_interval_secs: u64,
    pub kafka_brokers: String,
    #[serde(default = "default_kafka_client_id")]
    pub kafka_client_id: String,
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_secs)
    }

    pub fn verification_code_ttl(&self) -> Duration {
        Duration::from_secs(self.verification_code_ttl_secs)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_token_ttl_secs)
    }

    pub fn key_rotation_interval(&self) -> Duration {
        Duration::from_secs(self.key_rotation_interval_secs)
    }
}
