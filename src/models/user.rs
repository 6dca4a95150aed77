//! Principals

use serde::Serialize;

/// A registered user, as resolved from a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub core_id: String,
    /// Argon2 PHC string
    pub password_hash: String,
}

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub core_id: String,
    pub password_hash: String,
}

/// Public view of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub core_id: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            cpf: user.cpf.clone(),
            core_id: user.core_id.clone(),
        }
    }
}
