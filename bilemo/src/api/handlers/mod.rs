//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and authorization checks, via the [`crate::auth::permissions::RequiresPermission`]
//!   extractor and, for users, an ownership guard
//! - Business logic execution via database repositories
//! - Cache reads on list endpoints and tag invalidation after writes
//! - Response serialization through [`crate::api::serialization`]
//!
//! # Handler Modules
//!
//! - [`auth`]: Client login
//! - [`products`]: Product catalogue
//! - [`users`]: Users owned by the calling client
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the matching HTTP status code and
//! response body.

pub mod auth;
pub mod products;
pub mod users;
