//! API version negotiation.
//!
//! Clients select a payload version through a media type parameter on the `Accept` header:
//!
//! ```text
//! Accept: application/json; version=2.0
//! ```
//!
//! Requests without a `version` parameter get the configured default (`api.default_version`).
//! The version only changes which fields are serialized, never which routes exist.

use crate::{AppState, errors::Error};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const V1: ApiVersion = ApiVersion::new(1, 0);
    pub const V2: ApiVersion = ApiVersion::new(2, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V1
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("invalid API version '{0}', expected MAJOR or MAJOR.MINOR")]
pub struct InvalidVersion(pub String);

impl FromStr for ApiVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };
        let parse = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u16>().map_err(|_| invalid())
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

/// Find the first `version` media type parameter across all `Accept` headers.
pub fn version_from_accept(headers: &HeaderMap) -> Result<Option<ApiVersion>, InvalidVersion> {
    for value in headers.get_all(header::ACCEPT) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for media_range in value.split(',') {
            for param in media_range.split(';').skip(1) {
                let Some((name, raw)) = param.split_once('=') else {
                    continue;
                };
                if name.trim().eq_ignore_ascii_case("version") {
                    let raw = raw.trim().trim_matches('"');
                    return raw.parse().map(Some);
                }
            }
        }
    }
    Ok(None)
}

/// The API version requested by the caller, falling back to the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedVersion(pub ApiVersion);

impl FromRequestParts<AppState> for RequestedVersion {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match version_from_accept(&parts.headers) {
            Ok(Some(version)) => Ok(RequestedVersion(version)),
            Ok(None) => Ok(RequestedVersion(state.config.api.default_version)),
            Err(e) => Err(Error::BadRequest { message: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_parse_versions() {
        assert_eq!("2.0".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert_eq!("2".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert_eq!(" 1.5 ".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 5));
        assert!("".parse::<ApiVersion>().is_err());
        assert!("two".parse::<ApiVersion>().is_err());
        assert!("2.".parse::<ApiVersion>().is_err());
        assert!("-1".parse::<ApiVersion>().is_err());
        assert!("1.2.3".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_versions_order_numerically() {
        assert!(ApiVersion::new(1, 10) > ApiVersion::new(1, 9));
        assert!(ApiVersion::new(2, 0) > ApiVersion::new(1, 99));
        assert_eq!(ApiVersion::default(), ApiVersion::V1);
        assert_eq!(ApiVersion::new(2, 1).to_string(), "2.1");
    }

    #[test]
    fn test_version_from_accept() {
        assert_eq!(version_from_accept(&HeaderMap::new()), Ok(None));
        assert_eq!(version_from_accept(&accept(&["application/json"])), Ok(None));
        assert_eq!(
            version_from_accept(&accept(&["application/json; version=2.0"])),
            Ok(Some(ApiVersion::V2))
        );
        assert_eq!(
            version_from_accept(&accept(&["text/html, application/json;charset=utf-8; Version=\"1.0\""])),
            Ok(Some(ApiVersion::V1))
        );
        assert_eq!(
            version_from_accept(&accept(&["text/html", "application/json; version=2"])),
            Ok(Some(ApiVersion::V2))
        );
    }

    #[test]
    fn test_malformed_version_in_accept() {
        let err = version_from_accept(&accept(&["application/json; version=latest"])).unwrap_err();
        assert_eq!(err, InvalidVersion("latest".to_string()));
    }
}
