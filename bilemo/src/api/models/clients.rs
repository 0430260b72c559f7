//! API models for clients, the authenticated principals of the API.

use crate::db::models::clients::ClientDBResponse;
use crate::types::ClientId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Client role. `Admin` carries every `User` permission as well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

/// The client making the current request, as recovered from its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CurrentClient {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl CurrentClient {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

impl From<ClientDBResponse> for CurrentClient {
    fn from(db: ClientDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            roles: db.roles,
        }
    }
}
