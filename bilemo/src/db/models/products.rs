//! Database models for products.

use crate::api::models::products::ProductCreate;
use crate::types::ProductId;
use chrono::{DateTime, Utc};

/// Database request for creating a new product
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub title: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub text: Option<String>,
}

impl From<ProductCreate> for ProductCreateDBRequest {
    fn from(api: ProductCreate) -> Self {
        Self {
            title: api.title,
            price: api.price,
            description: api.description,
            features: api.features,
            text: api.text,
        }
    }
}

/// Database response for a product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub title: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
