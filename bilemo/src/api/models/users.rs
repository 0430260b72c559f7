//! API request/response models for users, the end customers a client manages.

use crate::db::models::users::UserDBResponse;
use crate::types::{ClientId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/users`. The owning client is always the caller, so any client field in the
/// payload is ignored.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UserCreate {
    #[serde(default)]
    #[schema(example = "jdoe")]
    #[validate(length(min = 1, max = 255, message = "The username must be between 1 and 255 characters."))]
    pub username: String,
    #[validate(length(max = 255, message = "The comment must be at most 255 characters."))]
    pub comment: Option<String>,
}

/// Body of `PUT /api/users/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: String,
    /// Applied only when the request negotiates API version 2 or later
    pub comment: Option<String>,
    /// Move the user to another client. Defaults to the caller.
    #[serde(rename = "idClient")]
    pub id_client: Option<ClientId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    /// Since API version 2.0
    pub comment: Option<String>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            comment: db.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_create_validation() {
        let user: UserCreate = serde_json::from_value(json!({"username": "jdoe", "comment": "hi"})).unwrap();
        assert!(user.validate().is_ok());

        let user: UserCreate = serde_json::from_value(json!({"comment": "no name"})).unwrap();
        assert!(user.validate().unwrap_err().field_errors().contains_key("username"));

        let user: UserCreate = serde_json::from_value(json!({"username": "jdoe", "comment": "c".repeat(256)})).unwrap();
        assert!(user.validate().unwrap_err().field_errors().contains_key("comment"));
    }

    #[test]
    fn test_user_create_ignores_client_fields() {
        let user: UserCreate = serde_json::from_value(json!({"username": "jdoe", "idClient": 99, "client": 99})).unwrap();
        assert_eq!(user.username, "jdoe");
    }

    #[test]
    fn test_user_update_reads_id_client() {
        let update: UserUpdate = serde_json::from_value(json!({"username": "jdoe", "idClient": 2})).unwrap();
        assert_eq!(update.id_client, Some(2));
        assert_eq!(update.comment, None);
    }
}
