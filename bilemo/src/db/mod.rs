//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Mutations go through a transaction which is committed before any cache invalidation:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Products::new(&mut tx);
//! let product = repo.create(&request).await?;
//! tx.commit().await?;
//! state.products_cache.invalidate_tags(&[PRODUCTS_CACHE_TAG]).await;
//! ```
//!
//! Read-only paths may use a pooled connection directly:
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! let mut repo = Users::new(&mut conn);
//! ```
//!
//! # Migrations
//!
//! Migrations live in the `migrations/` directory and are embedded with [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
