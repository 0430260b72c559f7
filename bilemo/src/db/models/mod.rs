//! Database record models matching table schemas.
//!
//! These are distinct from the API models in [`crate::api::models`] so that storage and wire
//! representations can evolve independently. Conversions live on the API side.
//!
//! - [`clients`]: Authenticated API consumers and their roles
//! - [`users`]: End users owned by a client
//! - [`products`]: The product catalogue

pub mod clients;
pub mod products;
pub mod users;
