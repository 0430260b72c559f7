//! OpenAPI documentation for the BileMo API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, errors};

/// Security scheme for the API (JWT bearer token).
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from `POST /api/login_check`. Include it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "BileMo API server")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login_check,
        api::handlers::products::list_products,
        api::handlers::products::get_product,
        api::handlers::products::create_product,
        api::handlers::products::delete_product,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::create_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::products::ProductCreate,
            api::models::products::ProductResponse,
            api::models::products::ProductLinks,
            api::models::products::Link,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            errors::Violation,
        )
    ),
    tags(
        (name = "authentication", description = "Exchange client credentials for a session token."),
        (name = "products", description = "The phone catalogue. Any client can read it; only admins can add or remove products."),
        (name = "users", description = "End users owned by the calling client."),
    ),
    info(
        title = "BileMo API",
        version = "2.0.0",
        description = "Catalogue and user management for BileMo's business clients.

## Authentication

Every endpoint except `/login_check` requires a token in the `Authorization` header:

```
Authorization: Bearer YOUR_TOKEN
```

## Versioning

Pick a version with the `Accept` header, e.g. `application/json; version=2.0`. Without one the server default applies. \
Version 2.0 adds the `comment` field to users.",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in ["/login_check", "/products", "/products/{id}", "/users", "/users/{id}"] {
            assert!(paths.contains(&expected), "missing {expected}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
