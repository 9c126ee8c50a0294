use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identity of a user: everything a token may carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
}

/// Full user record as held by the user store. The password hash is a salted
/// one-way digest and must never end up in logs or event payloads.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            name: self.name.clone(),
            surname: self.surname.clone(),
        }
    }
}

/// Access + refresh token pair returned to the caller. Ephemeral; only the
/// refresh token is persisted, standalone, as a session key.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
