use crate::{
    AppState,
    api::models::clients::CurrentClient,
    auth::session,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Extract the bearer token from the `Authorization` header.
/// Returns:
/// - None: No `Authorization` header, or a non-bearer scheme
/// - Some(Ok(token)): Bearer token present
/// - Some(Err(error)): Header present but not valid UTF-8
fn bearer_token(parts: &Parts) -> Option<Result<&str>> {
    let value = parts.headers.get(header::AUTHORIZATION)?;

    let value = match value.to_str() {
        Ok(v) => v,
        Err(e) => {
            return Some(Err(Error::Unauthenticated {
                message: Some(format!("Invalid authorization header: {e}")),
            }));
        }
    };

    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        trace!("Ignoring authorization header with scheme {}", scheme);
        return None;
    }
    Some(Ok(token.trim()))
}

impl FromRequestParts<AppState> for CurrentClient {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match bearer_token(parts) {
            Some(Ok(token)) => {
                let client = session::verify_session_token(token, &state.config)?;
                debug!("Found JWT authenticated client: {}", client.id);
                Ok(client)
            }
            Some(Err(e)) => Err(e),
            None => {
                trace!("No bearer token found in request");
                Err(Error::Unauthenticated {
                    message: Some("JWT Token not found".to_string()),
                })
            }
        }
    }
}
