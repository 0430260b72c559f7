//! Authentication and authorization.
//!
//! Clients authenticate by posting their email and password to `/api/login_check`, which answers
//! with a signed JWT. Every other `/api` route expects that token in an
//! `Authorization: Bearer <token>` header.
//!
//! Authorization happens in two steps:
//! - **Roles**: [`permissions`] maps `ROLE_USER` and `ROLE_ADMIN` to the operations they allow,
//!   and handlers demand an operation with the [`permissions::RequiresPermission`] extractor.
//! - **Ownership**: users belong to a client, and handlers refuse to show or change a user that
//!   belongs to a different client than the caller.
//!
//! # Modules
//!
//! - [`current_user`]: [`CurrentClient`](crate::api::models::clients::CurrentClient) extractor
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Role permission table and extractor
//! - [`session`]: JWT creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
