//! Resolved actor identity passed into engine mutations.
//!
//! Authentication and permission policy live with the caller; the engine only
//! needs to know who performed an action so events and audit fields can name
//! them.

use serde::{Deserialize, Serialize};

/// Role of the acting user within the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Member,
    Customer,
}

/// The user performing a mutation, as resolved by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}
