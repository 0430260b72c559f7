//! Group and version based field exposure.
//!
//! Each response type declares a static table of the fields it may expose, the serialization
//! groups each field belongs to, and optionally the API version that introduced it. A handler
//! serializes through a [`SerializationContext`] naming the group it renders and the version the
//! caller negotiated; any field not listed for that group, or newer than that version, is dropped.

use crate::api::models::{products::ProductResponse, users::UserResponse};
use crate::api::versioning::ApiVersion;
use crate::errors::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    GetProducts,
    GetUsers,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::GetProducts => write!(f, "getProducts"),
            Group::GetUsers => write!(f, "getUsers"),
        }
    }
}

/// One row of a type's visibility table.
#[derive(Debug, Clone, Copy)]
pub struct Exposure {
    pub field: &'static str,
    pub groups: &'static [Group],
    pub since: Option<ApiVersion>,
}

impl Exposure {
    pub const fn always(field: &'static str, groups: &'static [Group]) -> Self {
        Self { field, groups, since: None }
    }

    pub const fn since(field: &'static str, groups: &'static [Group], version: ApiVersion) -> Self {
        Self {
            field,
            groups,
            since: Some(version),
        }
    }
}

/// A response type with a field visibility table. Fields missing from the table are never
/// serialized.
pub trait Exposed: Serialize {
    const EXPOSURES: &'static [Exposure];
}

impl Exposed for ProductResponse {
    const EXPOSURES: &'static [Exposure] = &[
        Exposure::always("id", &[Group::GetProducts]),
        Exposure::always("title", &[Group::GetProducts]),
        Exposure::always("price", &[Group::GetProducts]),
        Exposure::always("description", &[Group::GetProducts]),
        Exposure::always("features", &[Group::GetProducts]),
        Exposure::always("text", &[Group::GetProducts]),
        Exposure::always("_links", &[Group::GetProducts]),
    ];
}

impl Exposed for UserResponse {
    const EXPOSURES: &'static [Exposure] = &[
        Exposure::always("id", &[Group::GetUsers]),
        Exposure::always("username", &[Group::GetUsers]),
        Exposure::since("comment", &[Group::GetUsers], ApiVersion::V2),
    ];
}

#[derive(Debug, Clone, Copy)]
pub struct SerializationContext {
    group: Group,
    version: ApiVersion,
}

impl SerializationContext {
    pub fn new(group: Group, version: ApiVersion) -> Self {
        Self { group, version }
    }

    fn exposes(&self, exposure: &Exposure) -> bool {
        exposure.groups.contains(&self.group) && exposure.since.is_none_or(|since| self.version >= since)
    }

    pub fn to_value<T: Exposed>(&self, item: &T) -> Result<Value> {
        let value = serde_json::to_value(item).map_err(|e| Error::Internal {
            operation: format!("serialize {} response: {e}", self.group),
        })?;

        let Value::Object(mut fields) = value else {
            return Ok(value);
        };
        fields.retain(|name, _| T::EXPOSURES.iter().any(|exposure| exposure.field == name && self.exposes(exposure)));
        Ok(Value::Object(fields))
    }

    pub fn to_value_list<'a, T, I>(&self, items: I) -> Result<Vec<Value>>
    where
        T: Exposed + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items.into_iter().map(|item| self.to_value(item)).collect()
    }
}
