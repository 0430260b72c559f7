//! Test utilities for integration testing.

use crate::{
    AppState,
    api::models::clients::{CurrentClient, Role},
    auth::{password::Argon2Params, session},
    config::{Config, PasswordConfig, PoolSettings},
    db::{
        handlers::{Clients, Products, Repository, Users},
        models::{
            clients::{ClientCreateDBRequest, ClientDBResponse},
            products::{ProductCreateDBRequest, ProductDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    types::ClientId,
};
use axum::http::{HeaderName, HeaderValue, header};
use axum_test::TestServer;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU64, Ordering};

static CLIENT_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-jwt".to_string()),
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    // Cheap hashing keeps the suite fast
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 128,
        argon2_iterations: 1,
        argon2_parallelism: 1,
    };
    config
}

pub fn fast_argon2_params() -> Argon2Params {
    Argon2Params::from(&create_test_config().auth.password)
}

pub fn create_test_state(pool: SqlitePool) -> AppState {
    AppState::new(pool, create_test_config())
}

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

/// Insert a client with a throwaway password
pub async fn create_test_client(pool: &SqlitePool, role: Role) -> ClientDBResponse {
    create_test_client_with_password(pool, role, "unused-test-password").await
}

pub async fn create_test_client_with_password(pool: &SqlitePool, role: Role, password: &str) -> ClientDBResponse {
    let n = CLIENT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let password_hash = crate::auth::password::hash_password(password, fast_argon2_params()).expect("Failed to hash password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Clients::new(&mut conn)
        .create(&ClientCreateDBRequest {
            name: format!("client{n}"),
            email: format!("client{n}@test.com"),
            password_hash,
            roles: vec![role],
        })
        .await
        .expect("Failed to create test client")
}

pub fn token_for(client: &CurrentClient, config: &Config) -> String {
    session::create_session_token(client, config).expect("Failed to create session token")
}

/// `Authorization` header carrying a token for `client`
pub fn auth_header(client: &ClientDBResponse) -> (HeaderName, HeaderValue) {
    let token = token_for(&CurrentClient::from(client.clone()), &create_test_config());
    let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value");
    (header::AUTHORIZATION, value)
}

/// `Accept` header requesting JSON at the given API version
pub fn accept_version(version: &str) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("application/json; version={version}")).expect("Invalid header value");
    (header::ACCEPT, value)
}

pub async fn create_test_product(pool: &SqlitePool, title: &str) -> ProductDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Products::new(&mut conn)
        .create(&ProductCreateDBRequest {
            title: title.to_string(),
            price: Some(199.99),
            description: Some(format!("description of {title}")),
            features: Some(format!("features of {title}")),
            text: Some(format!("text of {title}")),
        })
        .await
        .expect("Failed to create test product")
}

pub async fn create_test_user(pool: &SqlitePool, client_id: ClientId, username: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            client_id,
            username: username.to_string(),
            comment: Some(format!("comment for {username}")),
        })
        .await
        .expect("Failed to create test user")
}
