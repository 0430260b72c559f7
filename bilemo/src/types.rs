//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs
//! - Resource and operation enums for access control
//!
//! # ID Types
//!
//! All identifiers are SQLite `INTEGER PRIMARY KEY` values:
//!
//! - [`ClientId`]: Authenticated principal (API consumer) identifier
//! - [`UserId`]: End user managed by a client
//! - [`ProductId`]: Catalogue product identifier
//!
//! # Permission System
//!
//! - [`Resource`]: What entity type is being accessed
//! - [`Operation`]: What action is being performed
//! - [`Permission`]: Authorization requirement combining resource and operation
//!
//! Operations come in two flavors:
//! - **All**: Unrestricted access to every entity (e.g. `CreateAll` on products)
//! - **Own**: Restricted to entities owned by the caller's client (e.g. `UpdateOwn` on users)

use std::fmt;

// Type aliases for IDs
pub type ClientId = i64;
pub type UserId = i64;
pub type ProductId = i64;

// *-All means unrestricted access, *-Own means restricted to own resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Users,
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll | Operation::CreateOwn => write!(f, "create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "read"),
            Operation::UpdateOwn => write!(f, "update"),
            Operation::DeleteAll | Operation::DeleteOwn => write!(f, "delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Products => write!(f, "products"),
            Resource::Users => write!(f, "users"),
        }
    }
}
