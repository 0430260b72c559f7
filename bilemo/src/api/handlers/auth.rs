use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, LoginResponse},
        clients::CurrentClient,
    },
    auth::{
        password::{self, Argon2Params},
        session,
    },
    db::handlers::Clients,
    errors::{Error, JsonPayload, Result},
};
use axum::{Json, extract::State};
use tokio::sync::OnceCell;
use tracing::debug;

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Hash checked against when the email is unknown, built once with the configured parameters.
async fn dummy_hash(state: &AppState) -> Result<&'static str> {
    let params = Argon2Params::from(&state.config.auth.password);
    let hash = DUMMY_HASH
        .get_or_try_init(|| password::hash_blocking("no-such-client".to_string(), params))
        .await?;
    Ok(hash.as_str())
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid credentials.".to_string()),
    }
}

/// Exchange client credentials for a bearer token
#[utoipa::path(
    post,
    path = "/login_check",
    request_body = LoginRequest,
    tag = "authentication",
    summary = "Log in",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login_check(State(state): State<AppState>, payload: JsonPayload<LoginRequest>) -> Result<Json<LoginResponse>> {
    let Json(request) = payload?;

    let client = {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Clients::new(&mut pool_conn).get_by_email(&request.username).await?
    };

    let Some(client) = client else {
        // Unknown emails still pay for one verification
        let dummy = dummy_hash(&state).await?;
        password::verify_blocking(request.password, dummy.to_string()).await?;
        debug!("Rejected login for unknown email");
        return Err(invalid_credentials());
    };

    if !password::verify_blocking(request.password, client.password_hash.clone()).await? {
        debug!(client_id = client.id, "Rejected login with wrong password");
        return Err(invalid_credentials());
    }

    let current_client = CurrentClient::from(client);
    let token = session::create_session_token(&current_client, &state.config)?;

    Ok(Json(LoginResponse { token }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::{auth::LoginResponse, clients::Role};
    use crate::auth::session;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_returns_usable_token(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let client = create_test_client_with_password(&pool, Role::Admin, "password").await;

        let response = server
            .post("/api/login_check")
            .json(&json!({"username": client.email, "password": "password"}))
            .await;
        response.assert_status_ok();

        let body: LoginResponse = response.json();
        let current = session::verify_session_token(&body.token, &create_test_config()).unwrap();
        assert_eq!(current.id, client.id);
        assert!(current.is_admin());

        // The token opens the protected routes
        server
            .get("/api/products")
            .authorization_bearer(body.token)
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_rejects_bad_credentials(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let client = create_test_client_with_password(&pool, Role::User, "password").await;

        let response = server
            .post("/api/login_check")
            .json(&json!({"username": client.email, "password": "wrong"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Invalid credentials.");

        let response = server
            .post("/api/login_check")
            .json(&json!({"username": "nobody@apibilemo.com", "password": "password"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Invalid credentials.");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_email_still_verifies_a_password(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        // Even the password behind the stand-in hash is refused
        let response = server
            .post("/api/login_check")
            .json(&json!({"username": "ghost@apibilemo.com", "password": "no-such-client"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Invalid credentials.");

        let dummy = super::DUMMY_HASH.get().expect("stand-in hash is built on the first unknown email");
        assert!(dummy.starts_with("$argon2id$"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_with_malformed_body_is_bad_request(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/api/login_check")
            .json(&json!({"username": "someone@apibilemo.com", "password": 42}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
