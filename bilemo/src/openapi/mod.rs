//! OpenAPI documentation configuration.
//!
//! [`api::ApiDoc`] describes every endpoint under `/api/*` and is served by Scalar at `/api/doc`.

pub mod api;

pub use api::ApiDoc;
