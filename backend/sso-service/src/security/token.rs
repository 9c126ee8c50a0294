//! Token codec: stateless minting and verification of signed access tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::keys::SigningKeys;
use crate::models::{TokenPair, UserIdentity};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    /// Any structural or signature failure.
    #[error("invalid token")]
    Invalid,
}

/// Access-token claims. Fixed schema instead of a free-form map: subject id,
/// display fields and unix-seconds expiry, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub surname: String,
    pub exp: i64,
}

/// Mint a signed ES256 access token plus a fresh opaque refresh identifier.
pub fn issue(
    identity: &UserIdentity,
    ttl: Duration,
    keys: &SigningKeys,
) -> Result<TokenPair, TokenError> {
    let claims = Claims {
        sub: identity.id,
        name: identity.name.clone(),
        surname: identity.surname.clone(),
        exp: Utc::now().timestamp() + ttl.as_secs() as i64,
    };

    let access_token = encode(
        &Header::new(Algorithm::ES256),
        &claims,
        keys.encoding_key(),
    )
    .map_err(|_| TokenError::Invalid)?;

    Ok(TokenPair {
        access_token,
        refresh_token: Uuid::new_v4().to_string(),
    })
}

/// Verify a `"<scheme> <token>"` bearer value against a public key and the
/// clock. Consults no store; returns the subject id.
pub fn verify(bearer_value: &str, public_key_pem: &str) -> Result<Uuid, TokenError> {
    let (_scheme, token) = bearer_value.split_once(' ').ok_or(TokenError::Invalid)?;

    let decoding_key =
        DecodingKey::from_ec_pem(public_key_pem.as_bytes()).map_err(|_| TokenError::Invalid)?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = 0;

    let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|err| {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    })?;

    Ok(data.claims.sub)
}
