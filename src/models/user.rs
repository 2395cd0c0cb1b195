//! Represents a catalog user and the credential-free view handed to callers.

use serde::{Deserialize, Serialize};

/// A stored user record.
///
/// `password` is compared as plain text; see DESIGN.md before exposing this
/// anywhere beyond a trusted network.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// A user as returned after authentication. Never carries the credential.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserView {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}
