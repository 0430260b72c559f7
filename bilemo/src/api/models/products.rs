//! API request/response models for products.

use crate::db::models::products::ProductDBResponse;
use crate::types::ProductId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProductCreate {
    /// Missing titles deserialize to an empty string and fail validation
    #[serde(default)]
    #[schema(example = "Widget")]
    #[validate(length(min = 1, max = 255, message = "The product title must be between 1 and 255 characters."))]
    pub title: String,
    #[schema(example = 9.99)]
    #[validate(range(min = 0.0, message = "The price must be greater than or equal to zero."))]
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
}

impl Link {
    fn product(id: ProductId) -> Self {
        Self {
            href: format!("/api/products/{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    /// Only present for admin callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: ProductId,
    pub title: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "_links")]
    pub links: ProductLinks,
}

impl ProductResponse {
    /// Advertise the delete endpoint alongside the self link.
    pub fn with_delete_link(mut self) -> Self {
        self.links.delete = Some(Link::product(self.id));
        self
    }
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            price: db.price,
            description: db.description,
            features: db.features,
            text: db.text,
            links: ProductLinks {
                self_link: Link::product(db.id),
                delete: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn create(body: serde_json::Value) -> ProductCreate {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_product() {
        assert!(create(json!({"title": "Widget", "price": 9.99})).validate().is_ok());
        assert!(create(json!({"title": "Free", "price": 0.0})).validate().is_ok());
        assert!(create(json!({"title": "No price"})).validate().is_ok());
    }

    #[test]
    fn test_invalid_product() {
        let errors = create(json!({"title": "Widget", "price": -1})).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));

        let errors = create(json!({"title": "", "price": 1})).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let errors = create(json!({"price": 1})).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let errors = create(json!({"title": "x".repeat(256)})).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_response_links() {
        let now = Utc::now();
        let db = ProductDBResponse {
            id: 12,
            title: "Widget".to_string(),
            price: Some(9.99),
            description: None,
            features: None,
            text: None,
            created_at: now,
            updated_at: now,
        };

        let response = ProductResponse::from(db);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["_links"], json!({"self": {"href": "/api/products/12"}}));

        let value = serde_json::to_value(response.with_delete_link()).unwrap();
        assert_eq!(value["_links"]["delete"]["href"], "/api/products/12");
        assert!(value.get("created_at").is_none());
    }
}
