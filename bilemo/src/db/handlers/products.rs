//! Database repository for products.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::products::{ProductCreateDBRequest, ProductDBResponse},
};
use crate::types::ProductId;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

/// Filter for listing products
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub skip: i64,
    pub limit: i64,
}

impl ProductFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductDBResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            description: product.description,
            features: product.features,
            text: product.text,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

pub struct Products<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (title, price, description, features, text, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(request.price)
        .bind(&request.description)
        .bind(&request.features)
        .bind(&request.text)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(product.into())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(product.map(Into::into))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY id ASC LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(products.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::SqlitePool;

    fn widget(title: &str, price: Option<f64>) -> ProductCreateDBRequest {
        ProductCreateDBRequest {
            title: title.to_string(),
            price,
            description: Some("A small widget".to_string()),
            features: None,
            text: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_product(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Products::new(&mut conn);

        let created = repo.create(&widget("Widget", Some(9.99))).await.unwrap();
        assert_eq!(created.title, "Widget");
        assert_eq!(created.price, Some(9.99));
        assert_eq!(created.description.as_deref(), Some("A small widget"));

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_missing_product_returns_none(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Products::new(&mut conn);

        assert!(repo.get_by_id(4242).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_products_paginates_in_id_order(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Products::new(&mut conn);

        for i in 1..=5 {
            repo.create(&widget(&format!("title{i}"), Some(i as f64))).await.unwrap();
        }

        let first = repo.list(&ProductFilter::new(0, 3)).await.unwrap();
        let titles: Vec<_> = first.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["title1", "title2", "title3"]);

        let second = repo.list(&ProductFilter::new(3, 3)).await.unwrap();
        let titles: Vec<_> = second.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["title4", "title5"]);

        assert!(repo.list(&ProductFilter::new(6, 3)).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_product(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Products::new(&mut conn);

        let created = repo.create(&widget("Widget", None)).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_negative_price_rejected_by_schema(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Products::new(&mut conn);

        let result = repo.create(&widget("Widget", Some(-1.0))).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));

        let result = repo.create(&widget("", Some(1.0))).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }
}
