//! Database models for clients.

use crate::api::models::clients::Role;
use crate::types::ClientId;
use chrono::{DateTime, Utc};

/// Database request for creating a new client
#[derive(Debug, Clone)]
pub struct ClientCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Database response for a client
#[derive(Debug, Clone)]
pub struct ClientDBResponse {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientDBResponse {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
