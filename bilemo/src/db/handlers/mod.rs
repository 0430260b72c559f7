//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed SQLite connection (or transaction) and provides
//! strongly-typed operations returning models from [`crate::db::models`].
//!
//! - [`Products`]: Product catalogue
//! - [`Users`]: Client-scoped users
//! - [`Clients`]: Credentials and roles for authentication (not a [`Repository`])
//!
//! ```ignore
//! use bilemo::db::handlers::{Products, Repository, products::ProductFilter};
//!
//! let mut conn = pool.acquire().await?;
//! let page = Products::new(&mut conn).list(&ProductFilter::new(0, 3)).await?;
//! ```

pub mod clients;
pub mod products;
pub mod repository;
pub mod users;

pub use clients::Clients;
pub use products::Products;
pub use repository::Repository;
pub use users::Users;
