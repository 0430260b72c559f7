//! Database models for users.

use crate::types::{ClientId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub client_id: ClientId,
    pub username: String,
    pub comment: Option<String>,
}

/// Database request for updating a user. Every column is rewritten, so callers merge the
/// current row with the incoming changes before building this.
#[derive(Debug, Clone)]
pub struct UserUpdateDBRequest {
    pub client_id: ClientId,
    pub username: String,
    pub comment: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone, PartialEq)]
pub struct UserDBResponse {
    pub id: UserId,
    pub client_id: ClientId,
    pub username: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
