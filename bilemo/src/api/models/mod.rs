//! API request and response data models.
//!
//! API models are distinct from the database models in [`crate::db::models`], so the wire format
//! can evolve independently of storage. Request models carry `validator` rules; response models
//! are filtered through [`crate::api::serialization`] before they are written out.

pub mod auth;
pub mod clients;
pub mod pagination;
pub mod products;
pub mod users;
