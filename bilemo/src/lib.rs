//! # bilemo: product catalogue API for BileMo's business clients
//!
//! `bilemo` is a REST API through which BileMo's business clients browse the phone catalogue and
//! manage the end users attached to their account.
//!
//! ## Overview
//!
//! Every resource endpoint lives under `/api` and requires a JWT obtained from
//! `POST /api/login_check`. Two resource families are exposed:
//!
//! - **Products**: the catalogue. Every client can read it; only clients holding the admin role
//!   can add or remove products.
//! - **Users**: end users owned by a client. A client only ever sees and changes its own users;
//!   reaching for another client's user is answered with an ownership error, never with the
//!   resource.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses SQLite (through `sqlx`) for persistence.
//!
//! ### Request Flow
//!
//! A request first passes through the CORS and tracing layers. Handlers declare their
//! requirements as extractors: [`auth::permissions::RequiresPermission`] authenticates the bearer
//! token and checks the role table, [`api::versioning::RequestedVersion`] reads the API version
//! from the `Accept` header. The handler then talks to the database through repositories in
//! [`db::handlers`], and shapes its output through [`api::serialization`], which drops fields the
//! caller's serialization group or API version does not expose.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) holds the handlers, the request/response models, field exposure
//! and version negotiation.
//!
//! The **authentication layer** ([`auth`]) hashes passwords with Argon2, issues and verifies JWT
//! session tokens, and maps roles to permissions.
//!
//! The **cache** ([`cache`]) keeps list pages in memory. Entries are tagged, and every write to a
//! resource invalidates its tag once the transaction has committed.
//!
//! The **database layer** ([`db`]) uses the repository pattern to abstract data access.
//!
//! ## Configuration
//!
//! Configuration is loaded from a YAML file (default `config.yaml`) with environment variable
//! overrides prefixed `BILEMO_`. See [`config`] for the available settings.
//!
//! ## Getting Started
//!
//! ```no_run
//! use bilemo::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = Application::new(config).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::models::clients::Role,
    auth::password::{self, Argon2Params},
    cache::TagAwareCache,
    config::CorsOrigin,
    db::handlers::{Clients, Products, Repository, Users},
    db::models::{
        clients::ClientCreateDBRequest,
        products::{ProductCreateDBRequest, ProductDBResponse},
        users::{UserCreateDBRequest, UserDBResponse},
    },
    openapi::ApiDoc,
};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use rand::{prelude::RngExt, rng};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ClientId, ProductId, UserId};

/// Cached product pages, keyed by page and limit
pub type ProductPageCache = TagAwareCache<Arc<Vec<ProductDBResponse>>>;
/// Cached per-client user lists
pub type UserListCache = TagAwareCache<Arc<Vec<UserDBResponse>>>;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .products_cache(TagAwareCache::new(&cache_config))
///     .users_cache(TagAwareCache::new(&cache_config))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub products_cache: ProductPageCache,
    pub users_cache: UserListCache,
}

impl AppState {
    /// State with empty caches sized from `config.cache`.
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let products_cache = TagAwareCache::new(&config.cache);
        let users_cache = TagAwareCache::new(&config.cache);
        Self::builder()
            .db(db)
            .config(config)
            .products_cache(products_cache)
            .users_cache(users_cache)
            .build()
    }
}

/// Get the bilemo database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// A password nobody knows, for accounts that must exist but cannot log in yet.
fn unusable_password() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rng();
    (0..48).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect()
}

/// Create the initial admin client if it doesn't exist.
///
/// Idempotent: an existing client with this email keeps its data, is granted the admin role, and
/// has its password replaced when one is supplied. Without a password a new admin is created with
/// an unusable one.
///
/// Returns the ID of the created or existing admin client.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_client(
    email: &str,
    password: Option<&str>,
    params: Argon2Params,
    db: &SqlitePool,
) -> anyhow::Result<ClientId> {
    let password_hash = password::hash_blocking(password.map(str::to_string).unwrap_or_else(unusable_password), params).await?;

    let mut tx = db.begin().await?;
    let mut clients = Clients::new(&mut tx);

    if let Some(existing) = clients.get_by_email(email).await? {
        if password.is_some() {
            clients.update_password(existing.id, &password_hash).await?;
        }
        clients.grant_role(existing.id, Role::Admin).await?;
        tx.commit().await?;
        debug!(client_id = existing.id, "Initial admin client already exists");
        return Ok(existing.id);
    }

    let created = clients
        .create(&ClientCreateDBRequest {
            name: "admin".to_string(),
            email: email.to_string(),
            password_hash,
            roles: vec![Role::Admin],
        })
        .await?;

    tx.commit().await?;
    info!(client_id = created.id, "Created initial admin client");
    Ok(created.id)
}

/// Password shared by every fixture client
const FIXTURE_PASSWORD: &str = "password";

/// Populate an empty catalogue with demo data.
///
/// Creates `client1@apibilemo.com` and `client2@apibilemo.com`, an admin `admin@apibilemo.com`
/// (all with the password `password`), 20 users spread at random over the two clients and 20
/// products. Skipped entirely when any product already exists.
#[instrument(skip_all)]
pub async fn seed_fixtures(params: Argon2Params, db: &SqlitePool) -> anyhow::Result<()> {
    let password_hash = password::hash_blocking(FIXTURE_PASSWORD.to_string(), params).await?;

    // Drawn up front so no RNG is held across an await
    let (owner_picks, prices): (Vec<usize>, Vec<f64>) = {
        let mut rng = rng();
        (
            (0..20).map(|_| rng.random_range(0..2)).collect(),
            (0..20).map(|_| rng.random_range(0..=100) as f64).collect(),
        )
    };

    let mut tx = db.begin().await?;

    if Products::new(&mut tx).count().await? > 0 {
        info!("Catalogue already populated, skipping fixtures");
        return Ok(());
    }

    info!("Seeding fixtures");

    let mut client_ids = Vec::with_capacity(2);
    {
        let mut clients = Clients::new(&mut tx);
        for i in 1..=2 {
            let email = format!("client{i}@apibilemo.com");
            let id = match clients.get_by_email(&email).await? {
                Some(existing) => existing.id,
                None => {
                    clients
                        .create(&ClientCreateDBRequest {
                            name: i.to_string(),
                            email,
                            password_hash: password_hash.clone(),
                            roles: vec![Role::User],
                        })
                        .await?
                        .id
                }
            };
            client_ids.push(id);
        }

        if clients.get_by_email("admin@apibilemo.com").await?.is_none() {
            clients
                .create(&ClientCreateDBRequest {
                    name: "admin".to_string(),
                    email: "admin@apibilemo.com".to_string(),
                    password_hash: password_hash.clone(),
                    roles: vec![Role::Admin],
                })
                .await?;
        }
    }

    {
        let mut users = Users::new(&mut tx);
        for (j, pick) in owner_picks.iter().enumerate() {
            users
                .create(&UserCreateDBRequest {
                    client_id: client_ids[*pick],
                    username: format!("name{j}"),
                    comment: Some(format!("commentaire{j}")),
                })
                .await?;
        }
    }

    {
        let mut products = Products::new(&mut tx);
        for (k, price) in prices.iter().enumerate() {
            products
                .create(&ProductCreateDBRequest {
                    title: format!("title{k}"),
                    price: Some(*price),
                    description: Some(format!("description{k}")),
                    features: Some(format!("features{k}")),
                    text: Some(format!("text{k}")),
                })
                .await?;
        }
    }

    tx.commit().await?;
    debug!("Fixtures seeded");
    Ok(())
}

/// Open the connection pool described by `config.database`.
async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool_settings = &config.database.pool;
    let options = SqliteConnectOptions::from_str(&config.database.url)?.foreign_keys(true);

    let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
    let pool = SqlitePoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.acquire_timeout_secs))
        .idle_timeout(seconds(pool_settings.idle_timeout_secs))
        .max_lifetime(seconds(pool_settings.max_lifetime_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run migrations, then make sure the admin client and optional fixtures exist.
async fn setup_database(config: &Config, pool: Option<SqlitePool>) -> anyhow::Result<SqlitePool> {
    let pool = match pool {
        Some(pool) => pool,
        None => {
            info!("Connecting to {}", config.database.url);
            connect(config).await?
        }
    };

    migrator().run(&pool).await?;

    let params = Argon2Params::from(&config.auth.password);
    create_initial_admin_client(&config.admin_email, config.admin_password.as_deref(), params, &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin client: {e}"))?;

    if config.seed_fixtures {
        seed_fixtures(params, &pool).await?;
    }

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.cors;

    // A literal "*" inside an origin list is rejected by tower-http, so the wildcard is its own mode
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers([header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/login_check", post(api::handlers::auth::login_check))
        // Products (writes are admin only)
        .route(
            "/products",
            get(api::handlers::products::list_products).post(api::handlers::products::create_product),
        )
        .route(
            "/products/{id}",
            get(api::handlers::products::get_product).delete(api::handlers::products::delete_product),
        )
        // Users of the calling client
        .route(
            "/users",
            get(api::handlers::users::list_users).post(api::handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(api::handlers::users::get_user)
                .put(api::handlers::users::update_user)
                .delete(api::handlers::users::delete_user),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/doc", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Connect to the configured database and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], reusing an existing pool when one is given.
    pub async fn new_with_pool(config: Config, pool: Option<SqlitePool>) -> anyhow::Result<Self> {
        debug!("Starting bilemo with configuration: {:#?}", config);

        let pool = setup_database(&config, pool).await?;
        let app_state = AppState::new(pool.clone(), config.clone());
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "BileMo API listening on http://{}, docs at http://localhost:{}/api/doc",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
