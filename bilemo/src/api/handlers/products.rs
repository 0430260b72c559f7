use crate::api::models::clients::CurrentClient;
use crate::api::models::pagination::PageQuery;
use crate::api::models::products::{ProductCreate, ProductResponse};
use crate::api::serialization::{Group, SerializationContext};
use crate::api::versioning::RequestedVersion;
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::cache::{PRODUCTS_CACHE_TAG, products_page_key};
use crate::db::handlers::{Products, Repository, products::ProductFilter};
use crate::db::models::products::{ProductCreateDBRequest, ProductDBResponse};
use crate::errors::{Error, JsonPayload, Result};
use crate::{AppState, types::ProductId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::Value;
use sqlx::Acquire;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

fn product_response(product: ProductDBResponse, caller: &CurrentClient) -> ProductResponse {
    let response = ProductResponse::from(product);
    if caller.is_admin() { response.with_delete_link() } else { response }
}

fn product_not_found(id: ProductId) -> Error {
    Error::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    summary = "List products",
    description = "Paginated product catalogue. Pages are cached until a product is created or deleted.",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of products", body = Vec<ProductResponse>),
        (status = 400, description = "Malformed query or version"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Products, operation::ReadAll>,
) -> Result<Json<Vec<Value>>> {
    let key = products_page_key(query.page(), query.limit());
    let products = state
        .products_cache
        .get_or_try_insert_with(&key, &[PRODUCTS_CACHE_TAG], || async {
            let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            let mut repo = Products::new(&mut pool_conn);
            let products = repo.list(&ProductFilter::new(query.offset(), query.limit() as i64)).await?;
            Ok::<_, Error>(Arc::new(products))
        })
        .await?;

    let responses: Vec<ProductResponse> = products
        .iter()
        .cloned()
        .map(|product| product_response(product, &perm.client))
        .collect();

    let context = SerializationContext::new(Group::GetProducts, version);
    Ok(Json(context.to_value_list(&responses)?))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    summary = "Get product",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Products, operation::ReadAll>,
) -> Result<Json<Value>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut pool_conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    let context = SerializationContext::new(Group::GetProducts, version);
    Ok(Json(context.to_value(&product_response(product, &perm.client))?))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    summary = "Create product",
    request_body = ProductCreate,
    responses(
        (status = 201, description = "Product created", body = ProductResponse,
            headers(("Location" = String, description = "URL of the new product"))),
        (status = 400, description = "Validation failed", body = Vec<crate::errors::Violation>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Products, operation::CreateAll>,
    payload: JsonPayload<ProductCreate>,
) -> Result<impl IntoResponse> {
    let Json(data) = payload?;
    data.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let product;
    {
        let mut repo = Products::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
        product = repo.create(&ProductCreateDBRequest::from(data)).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    state.products_cache.invalidate_tags(&[PRODUCTS_CACHE_TAG]).await;

    info!(product_id = product.id, client_id = perm.client.id, "Created product");

    let location = format!("/api/products/{}", product.id);
    let context = SerializationContext::new(Group::GetProducts, version);
    let body = context.to_value(&product_response(product, &perm.client))?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    summary = "Delete product",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Product not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    perm: RequiresPermission<resource::Products, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let deleted;
    {
        let mut repo = Products::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
        deleted = repo.delete(id).await?;
    }
    if !deleted {
        return Err(product_not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    state.products_cache.invalidate_tags(&[PRODUCTS_CACHE_TAG]).await;

    info!(product_id = id, client_id = perm.client.id, "Deleted product");
    Ok(StatusCode::NO_CONTENT)
}
