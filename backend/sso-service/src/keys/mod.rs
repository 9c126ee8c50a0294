//! Signing-key authority.
//!
//! Maintains exactly one active P-256 key pair for token signing. A
//! background loop regenerates the pair on a fixed interval, hands the
//! private half to the in-process signer through a single-slot latest-wins
//! channel, and pushes the PEM-encoded public half to every registered
//! downstream subscriber.
//!
//! Only the single most recent public key is distributed. Around a rotation
//! there is a narrow window where a downstream verifier still holds the
//! previous key and will reject tokens signed with the new one (or accept
//! ones signed with the old key past the intended cutover). Known and
//! accepted; verifiers tolerate a key that is one generation behind.

pub mod subscriber;

use anyhow::{Context, Result};
use jsonwebtoken::EncodingKey;
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use subscriber::{PublicKeySubscriber, RetryConfig};

/// One generation of signing material. The encoding key is exclusively for
/// the in-process signer; downstream services only ever see the public PEM.
pub struct SigningKeys {
    generation: u64,
    encoding: EncodingKey,
    public_key_pem: String,
}

impl SigningKeys {
    pub(crate) fn generate(generation: u64) -> Result<Self> {
        let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);

        let private_pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .context("failed to encode private key as PKCS#8")?;
        let encoding = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .context("failed to build ES256 signing key")?;

        let public_key_pem = secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .context("failed to encode public key as SPKI")?;

        Ok(Self {
            generation,
            encoding,
            public_key_pem,
        })
    }

    /// Monotonic rotation counter, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// X.509/SPKI PEM encoding of the public key, as pushed to subscribers.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

/// Read side of the single-slot key handoff. Cloneable; every reader
/// observes the most recent generation, older unread values are silently
/// superseded.
#[derive(Clone)]
pub struct KeyHandle {
    rx: watch::Receiver<Option<Arc<SigningKeys>>>,
}

impl KeyHandle {
    /// Latest generated key pair, or `None` before the first generation.
    pub fn latest(&self) -> Option<Arc<SigningKeys>> {
        self.rx.borrow().clone()
    }

    /// Wait until a key pair is available. Returns `None` only if the
    /// authority shut down before producing one.
    pub async fn wait_available(&mut self) -> Option<Arc<SigningKeys>> {
        loop {
            if let Some(keys) = self.rx.borrow_and_update().clone() {
                return Some(keys);
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

/// Generates key pairs on a fixed interval and distributes them.
pub struct KeyAuthority {
    interval: Duration,
    retry: RetryConfig,
    subscribers: Vec<Arc<dyn PublicKeySubscriber>>,
}

impl KeyAuthority {
    pub fn new(interval: Duration, retry: RetryConfig) -> Self {
        Self {
            interval,
            retry,
            subscribers: Vec::new(),
        }
    }

    /// Register a downstream verifier to receive every published public key.
    pub fn subscribe(&mut self, subscriber: Arc<dyn PublicKeySubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Start the rotation loop. The first key pair is generated immediately.
    pub fn spawn(self) -> (KeyHandle, KeyAuthorityTask) {
        let (key_tx, key_rx) = watch::channel(None);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let KeyAuthority {
            interval,
            retry,
            subscribers,
        } = self;

        let handle = tokio::spawn(async move {
            let mut generation: u64 = 0;

            loop {
                generation += 1;
                match SigningKeys::generate(generation) {
                    Ok(keys) => {
                        let keys = Arc::new(keys);
                        key_tx.send_replace(Some(keys.clone()));
                        info!(generation, "generated new signing key pair");

                        tokio::select! {
                            _ = stop_rx.changed() => break,
                            _ = publish_all(&subscribers, &retry, &keys) => {}
                        }
                    }
                    // Entropy-source failure: keep signing with the previous
                    // pair rather than tearing anything down.
                    Err(err) => {
                        error!(error = %err, "failed to generate signing keys, keeping previous pair");
                    }
                }

                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            info!("key authority stopped");
        });

        (
            KeyHandle { rx: key_rx },
            KeyAuthorityTask {
                stop: stop_tx,
                handle,
            },
        )
    }
}

/// Push the public key to every subscriber, sequentially, with bounded
/// retries. A subscriber that stays down is logged and skipped; it never
/// blocks or rolls back the rotation.
async fn publish_all(
    subscribers: &[Arc<dyn PublicKeySubscriber>],
    retry: &RetryConfig,
    keys: &SigningKeys,
) {
    for sub in subscribers {
        let outcome = subscriber::with_retry(retry, || sub.set_public_key(keys.public_key_pem()));

        match outcome.await {
            Ok(()) => info!(
                subscriber = sub.name(),
                generation = keys.generation(),
                "public key delivered"
            ),
            Err(err) => error!(
                subscriber = sub.name(),
                generation = keys.generation(),
                error = %err,
                "failed to deliver public key"
            ),
        }
    }
}

/// Owner of the background rotation loop.
pub struct KeyAuthorityTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl KeyAuthorityTask {
    /// Terminate the loop and release the handoff channel. Readers keep the
    /// last observed key.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}
