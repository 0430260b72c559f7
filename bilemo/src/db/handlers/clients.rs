//! Database repository for clients.

use crate::api::models::clients::Role;
use crate::db::{
    errors::{DbError, Result},
    models::clients::{ClientCreateDBRequest, ClientDBResponse},
};
use crate::types::ClientId;
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(Vec<Role>, Client)> for ClientDBResponse {
    fn from((roles, client): (Vec<Role>, Client)) -> Self {
        Self {
            id: client.id,
            name: client.name,
            email: client.email,
            password_hash: client.password_hash,
            roles,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// Clients are only ever created by seeding and looked up during authentication, so this
/// repository exposes exactly those operations rather than the full [`super::Repository`] surface.
pub struct Clients<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Clients<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    pub async fn create(&mut self, request: &ClientCreateDBRequest) -> Result<ClientDBResponse> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut roles = request.roles.clone();
        if !roles.contains(&Role::User) {
            roles.push(Role::User);
        }
        for role in &roles {
            sqlx::query("INSERT INTO client_roles (client_id, role) VALUES ($1, $2)")
                .bind(client.id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(ClientDBResponse::from((roles, client)))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ClientId) -> Result<Option<ClientDBResponse>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match client {
            Some(client) => {
                let roles = self.roles(client.id).await?;
                Ok(Some(ClientDBResponse::from((roles, client))))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<ClientDBResponse>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        match client {
            Some(client) => {
                let roles = self.roles(client.id).await?;
                Ok(Some(ClientDBResponse::from((roles, client))))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn exists(&mut self, id: ClientId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, password_hash), err)]
    pub async fn update_password(&mut self, id: ClientId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE clients SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Grant a role, leaving existing roles in place
    #[instrument(skip(self), err)]
    pub async fn grant_role(&mut self, id: ClientId, role: Role) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO client_roles (client_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(role)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    async fn roles(&mut self, id: ClientId) -> Result<Vec<Role>> {
        let roles: Vec<Role> = sqlx::query_scalar("SELECT role FROM client_roles WHERE client_id = $1 ORDER BY role")
            .bind(id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    fn request(email: &str, roles: Vec<Role>) -> ClientCreateDBRequest {
        ClientCreateDBRequest {
            name: "Acme".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            roles,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_client_always_has_user_role(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Clients::new(&mut conn);

        let created = repo.create(&request("acme@example.com", vec![Role::Admin])).await.unwrap();
        assert!(created.roles.contains(&Role::Admin));
        assert!(created.roles.contains(&Role::User));
        assert!(created.is_admin());

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "acme@example.com");
        assert_eq!(fetched.roles.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_client_by_email(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Clients::new(&mut conn);

        let created = repo.create(&request("find@example.com", vec![])).await.unwrap();
        let found = repo.get_by_email("find@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.roles, vec![Role::User]);
        assert!(!found.is_admin());

        assert!(repo.get_by_email("missing@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Clients::new(&mut conn);

        repo.create(&request("dup@example.com", vec![])).await.unwrap();
        let result = repo.create(&request("dup@example.com", vec![])).await;
        match result {
            Err(DbError::UniqueViolation { table, constraint, .. }) => {
                assert_eq!(table.as_deref(), Some("clients"));
                assert_eq!(constraint.as_deref(), Some("email"));
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_password_and_grant_role(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Clients::new(&mut conn);

        let created = repo.create(&request("pw@example.com", vec![])).await.unwrap();
        repo.update_password(created.id, "new-hash").await.unwrap();
        repo.grant_role(created.id, Role::Admin).await.unwrap();
        repo.grant_role(created.id, Role::Admin).await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.password_hash, "new-hash");
        assert!(fetched.is_admin());
        assert_eq!(fetched.roles.len(), 2);

        assert!(repo.exists(created.id).await.unwrap());
        assert!(!repo.exists(created.id + 100).await.unwrap());
        assert!(matches!(repo.update_password(created.id + 100, "x").await, Err(DbError::NotFound)));
    }
}
