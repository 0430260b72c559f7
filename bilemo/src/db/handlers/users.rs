//! Database repository for users.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{ClientId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

/// Filter for listing users. Users are always listed within a single client.
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub client_id: ClientId,
}

impl UserFilter {
    pub fn for_client(client_id: ClientId) -> Self {
        Self { client_id }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub client_id: ClientId,
    pub username: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            client_id: user.client_id,
            username: user.username,
            comment: user.comment,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(client_id = request.client_id, username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (client_id, username, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(request.client_id)
        .bind(&request.username)
        .bind(&request.comment)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user.into())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    #[instrument(skip(self, filter), fields(client_id = filter.client_id), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE client_id = $1 ORDER BY id ASC")
            .bind(filter.client_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Rewrite every column of a user, including its owning client.
    #[instrument(skip(self, request), fields(client_id = request.client_id), err)]
    pub async fn update(&mut self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                client_id = $2,
                username = $3,
                comment = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.client_id)
        .bind(&request.username)
        .bind(&request.comment)
        .bind(Utc::now())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::clients::Role;
    use crate::test_utils::create_test_client;
    use sqlx::SqlitePool;

    fn new_user(client_id: ClientId, username: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            client_id,
            username: username.to_string(),
            comment: Some(format!("comment for {username}")),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_user(pool: SqlitePool) {
        let client = create_test_client(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&new_user(client.id, "alice")).await.unwrap();
        assert_eq!(created.client_id, client.id);
        assert_eq!(created.username, "alice");
        assert_eq!(created.comment.as_deref(), Some("comment for alice"));

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_for_missing_client_fails(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let result = repo.create(&new_user(777, "ghost")).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_only_returns_users_of_client(pool: SqlitePool) {
        let first = create_test_client(&pool, Role::User).await;
        let second = create_test_client(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&new_user(first.id, "a1")).await.unwrap();
        repo.create(&new_user(second.id, "b1")).await.unwrap();
        repo.create(&new_user(first.id, "a2")).await.unwrap();

        let users = repo.list(&UserFilter::for_client(first.id)).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["a1", "a2"]);
        assert!(users.iter().all(|u| u.client_id == first.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_user_reassigns_client(pool: SqlitePool) {
        let first = create_test_client(&pool, Role::User).await;
        let second = create_test_client(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&new_user(first.id, "bob")).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &UserUpdateDBRequest {
                    client_id: second.id,
                    username: "robert".to_string(),
                    comment: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.client_id, second.id);
        assert_eq!(updated.username, "robert");
        assert_eq!(updated.comment, None);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_user_is_not_found(pool: SqlitePool) {
        let client = create_test_client(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let result = repo
            .update(
                12345,
                &UserUpdateDBRequest {
                    client_id: client.id,
                    username: "nobody".to_string(),
                    comment: None,
                },
            )
            .await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_user(pool: SqlitePool) {
        let client = create_test_client(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&new_user(client.id, "carol")).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
