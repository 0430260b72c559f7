//! Role-based permission table and the [`RequiresPermission`] extractor.
//!
//! Handlers declare what they need in their signature:
//!
//! ```ignore
//! pub async fn create_product(
//!     State(state): State<AppState>,
//!     perm: RequiresPermission<resource::Products, operation::CreateAll>,
//!     Json(data): Json<ProductCreate>,
//! ) -> Result<...> {
//!     let caller = perm.client;
//! }
//! ```
//!
//! Ownership of individual users (`*Own` operations) is not decided here. The handler compares
//! the user's client with the caller once the user has been loaded.

use crate::{
    AppState,
    api::models::clients::{CurrentClient, Role},
    errors::Error,
    types::{Operation, Permission, Resource},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use tracing::debug;

const USER_PERMISSIONS: &[(Resource, Operation)] = &[
    (Resource::Products, Operation::ReadAll),
    (Resource::Users, Operation::CreateOwn),
    (Resource::Users, Operation::ReadOwn),
    (Resource::Users, Operation::UpdateOwn),
    (Resource::Users, Operation::DeleteOwn),
];

const ADMIN_PERMISSIONS: &[(Resource, Operation)] = &[
    (Resource::Products, Operation::CreateAll),
    (Resource::Products, Operation::DeleteAll),
];

/// Permissions granted directly by a role. Admins also hold every user permission.
pub fn role_permissions(role: Role) -> impl Iterator<Item = &'static (Resource, Operation)> {
    let extra: &[(Resource, Operation)] = match role {
        Role::User => &[],
        Role::Admin => ADMIN_PERMISSIONS,
    };
    USER_PERMISSIONS.iter().chain(extra.iter())
}

pub fn has_permission(client: &CurrentClient, resource: Resource, operation: Operation) -> bool {
    client
        .roles
        .iter()
        .any(|role| role_permissions(*role).any(|granted| *granted == (resource, operation)))
}

pub trait ResourceMarker {
    const RESOURCE: Resource;
}

pub trait OperationMarker {
    const OPERATION: Operation;
}

pub mod resource {
    use super::ResourceMarker;
    use crate::types::Resource;

    pub struct Products;
    pub struct Users;

    impl ResourceMarker for Products {
        const RESOURCE: Resource = Resource::Products;
    }

    impl ResourceMarker for Users {
        const RESOURCE: Resource = Resource::Users;
    }
}

pub mod operation {
    use super::OperationMarker;
    use crate::types::Operation;

    macro_rules! operation_marker {
        ($($name:ident),*) => {
            $(
                pub struct $name;
                impl OperationMarker for $name {
                    const OPERATION: Operation = Operation::$name;
                }
            )*
        };
    }

    operation_marker!(CreateAll, CreateOwn, ReadAll, ReadOwn, UpdateOwn, DeleteAll, DeleteOwn);
}

/// Authenticates the caller and checks it holds `O` on `R`.
pub struct RequiresPermission<R, O> {
    pub client: CurrentClient,
    _marker: PhantomData<fn() -> (R, O)>,
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: ResourceMarker,
    O: OperationMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let client = CurrentClient::from_request_parts(parts, state).await?;

        if !has_permission(&client, R::RESOURCE, O::OPERATION) {
            debug!(client_id = client.id, "Client lacks {:?} on {}", O::OPERATION, R::RESOURCE);
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: R::RESOURCE.to_string(),
            });
        }

        Ok(Self {
            client,
            _marker: PhantomData,
        })
    }
}
