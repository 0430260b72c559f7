use crate::api::models::clients::CurrentClient;
use crate::api::models::users::{UserCreate, UserResponse, UserUpdate};
use crate::api::serialization::{Group, SerializationContext};
use crate::api::versioning::{ApiVersion, RequestedVersion};
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::cache::{USERS_CACHE_TAG, users_list_key};
use crate::db::handlers::{Clients, Repository, Users, users::UserFilter};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest};
use crate::errors::{Error, JsonPayload, Result};
use crate::{AppState, types::UserId};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::Value;
use sqlx::{Acquire, SqliteConnection};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

const NOT_YOURS: &str = "You are lost. You do not have the rights.";
const NO_SUCH_USER: &str = "This user does not exist.";

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Load a user and check it belongs to the caller.
async fn load_owned_user(
    conn: &mut SqliteConnection,
    state: &AppState,
    id: UserId,
    caller: &CurrentClient,
    mismatch_message: &str,
) -> Result<UserDBResponse> {
    let user = Users::new(conn).get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;

    if user.client_id != caller.id {
        info!(user_id = id, owner = user.client_id, caller = caller.id, "Rejected access to another client's user");
        return Err(Error::NotOwned {
            message: mismatch_message.to_string(),
            legacy_status: state.config.api.legacy_ownership_status,
        });
    }
    Ok(user)
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    description = "All users belonging to the calling client. `comment` is included from API version 2.0.",
    responses(
        (status = 200, description = "The caller's users", body = Vec<UserResponse>),
        (status = 400, description = "Malformed version"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Users, operation::ReadOwn>,
) -> Result<Json<Vec<Value>>> {
    let client_id = perm.client.id;
    let users = state
        .users_cache
        .get_or_try_insert_with(&users_list_key(client_id), &[USERS_CACHE_TAG], || async {
            let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            let users = Users::new(&mut pool_conn).list(&UserFilter::for_client(client_id)).await?;
            Ok::<_, Error>(Arc::new(users))
        })
        .await?;

    let responses: Vec<UserResponse> = users.iter().cloned().map(UserResponse::from).collect();
    let context = SerializationContext::new(Group::GetUsers, version);
    Ok(Json(context.to_value_list(&responses)?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get user",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 203, description = "User belongs to another client (legacy mode)", body = String),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "User belongs to another client", body = String),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Users, operation::ReadOwn>,
) -> Result<Json<Value>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = load_owned_user(&mut pool_conn, &state, id, &perm.client, NOT_YOURS).await?;

    let context = SerializationContext::new(Group::GetUsers, version);
    Ok(Json(context.to_value(&UserResponse::from(user))?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    description = "Creates a user owned by the calling client. Client fields in the body are ignored.",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse,
            headers(("Location" = String, description = "URL of the new user"))),
        (status = 400, description = "Validation failed", body = Vec<crate::errors::Violation>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Users, operation::CreateOwn>,
    payload: JsonPayload<UserCreate>,
) -> Result<impl IntoResponse> {
    let Json(data) = payload?;
    data.validate()?;

    let request = UserCreateDBRequest {
        client_id: perm.client.id,
        username: data.username,
        comment: data.comment,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let user;
    {
        let mut repo = Users::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
        user = repo.create(&request).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    state.users_cache.invalidate_tags(&[USERS_CACHE_TAG]).await;

    info!(user_id = user.id, client_id = perm.client.id, "Created user");

    let location = format!("/api/users/{}", user.id);
    let context = SerializationContext::new(Group::GetUsers, version);
    let body = context.to_value(&UserResponse::from(user))?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    description = "Replaces the username. The comment is only replaced when the request negotiates API version 2.0 \
        or later. `idClient` moves the user to another client; without it the user is owned by the caller.",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 204, description = "User updated"),
        (status = 203, description = "User belongs to another client (legacy mode)", body = String),
        (status = 400, description = "Validation failed or unknown idClient"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "User belongs to another client", body = String),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    RequestedVersion(version): RequestedVersion,
    perm: RequiresPermission<resource::Users, operation::UpdateOwn>,
    payload: JsonPayload<UserUpdate>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let existing = load_owned_user(
        tx.acquire().await.map_err(|e| Error::Database(e.into()))?,
        &state,
        id,
        &perm.client,
        NO_SUCH_USER,
    )
    .await?;

    // Ownership is settled before the body is parsed
    let Json(data) = payload?;

    let merged = UserCreate {
        username: data.username,
        comment: if version >= ApiVersion::V2 { data.comment } else { existing.comment },
    };
    merged.validate()?;

    let client_id = match data.id_client {
        Some(client_id) if client_id != perm.client.id => {
            let exists = Clients::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?)
                .exists(client_id)
                .await?;
            if !exists {
                return Err(Error::BadRequest {
                    message: format!("Client {client_id} does not exist"),
                });
            }
            client_id
        }
        _ => perm.client.id,
    };

    {
        let mut repo = Users::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
        repo.update(
            id,
            &UserUpdateDBRequest {
                client_id,
                username: merged.username,
                comment: merged.comment,
            },
        )
        .await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    state.users_cache.invalidate_tags(&[USERS_CACHE_TAG]).await;

    info!(user_id = id, client_id, "Updated user");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    summary = "Delete user",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 203, description = "User belongs to another client (legacy mode)", body = String),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "User belongs to another client", body = String),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    perm: RequiresPermission<resource::Users, operation::DeleteOwn>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    load_owned_user(
        tx.acquire().await.map_err(|e| Error::Database(e.into()))?,
        &state,
        id,
        &perm.client,
        NO_SUCH_USER,
    )
    .await?;

    {
        let mut repo = Users::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);
        repo.delete(id).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    state.users_cache.invalidate_tags(&[USERS_CACHE_TAG]).await;

    info!(user_id = id, client_id = perm.client.id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
