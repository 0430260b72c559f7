//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`serialization`]**: Group and version based field filtering of responses
//! - **[`versioning`]**: `Accept` header version negotiation
//!
//! # API Structure
//!
//! - **Authentication** (`/api/login_check`): exchange client credentials for a JWT
//! - **Products** (`/api/products/*`): catalogue, readable by every client, managed by admins
//! - **Users** (`/api/users/*`): the caller's own users
//!
//! API documentation is available at `/api/doc` when the server is running.

pub mod handlers;
pub mod models;
pub mod serialization;
pub mod versioning;
