//! Unified error types for the Atlas administrative core
//!
//! Every failure the core can report is a variant of [`AtlasError`]. Callers
//! that need a stable, translatable discriminant use [`AtlasError::kind`].

use crate::types::{EntityKind, Id};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

/// Core error type for the Atlas platform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AtlasError {
    /// Referenced entity does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Id },

    /// A node was proposed as its own parent
    #[error("{kind} {id} cannot be its own parent")]
    SelfParent { kind: EntityKind, id: Id },

    /// A parent chain loops back on itself
    #[error("cycle detected in {kind} hierarchy at {id}")]
    CycleDetected { kind: EntityKind, id: Id },

    /// Delete requested on a node that still has children
    #[error("{kind} {id} has {children} child node(s)")]
    HasChildren {
        kind: EntityKind,
        id: Id,
        children: usize,
    },

    /// Delete requested on a role that still has member users
    #[error("role {role} still has {members} member(s)")]
    HasMembers { role: Id, members: usize },

    /// Unique code already taken by another entity of the same kind
    #[error("{kind} code '{code}' is already in use")]
    DuplicateCode { kind: EntityKind, code: String },

    /// Unique name already taken by another entity of the same kind
    #[error("{kind} name '{name}' is already in use")]
    DuplicateName { kind: EntityKind, name: String },

    /// Parent exists but lies outside the node's scope
    ///
    /// `id` is `None` when the node is being created.
    #[error("{kind} {parent} belongs to another scope and cannot be used as a parent")]
    InvalidParent {
        kind: EntityKind,
        id: Option<Id>,
        parent: Id,
    },

    /// Malformed request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The relation store failed or aborted the transaction
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AtlasError {
    /// Create a not found error
    pub fn not_found(kind: EntityKind, id: Id) -> Self {
        AtlasError::NotFound { kind, id }
    }

    /// Create an invalid input error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        AtlasError::InvalidInput(msg.into())
    }

    /// Create a store unavailable error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        AtlasError::StoreUnavailable(msg.into())
    }

    /// Discriminant of this error, without payload
    pub fn kind(&self) -> ErrorKind {
        match self {
            AtlasError::NotFound { .. } => ErrorKind::NotFound,
            AtlasError::SelfParent { .. } => ErrorKind::SelfParent,
            AtlasError::CycleDetected { .. } => ErrorKind::CycleDetected,
            AtlasError::HasChildren { .. } => ErrorKind::HasChildren,
            AtlasError::HasMembers { .. } => ErrorKind::HasMembers,
            AtlasError::DuplicateCode { .. } => ErrorKind::DuplicateCode,
            AtlasError::DuplicateName { .. } => ErrorKind::DuplicateName,
            AtlasError::InvalidParent { .. } => ErrorKind::InvalidParent,
            AtlasError::InvalidInput(_) => ErrorKind::InvalidInput,
            AtlasError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }
}

/// Fieldless error discriminant handed to the locale layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    SelfParent,
    CycleDetected,
    HasChildren,
    HasMembers,
    DuplicateCode,
    DuplicateName,
    InvalidParent,
    InvalidInput,
    StoreUnavailable,
}

impl ErrorKind {
    /// Stable message key, used for translation lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::SelfParent => "SELF_PARENT",
            ErrorKind::CycleDetected => "CYCLE_DETECTED",
            ErrorKind::HasChildren => "HAS_CHILDREN",
            ErrorKind::HasMembers => "HAS_MEMBERS",
            ErrorKind::DuplicateCode => "DUPLICATE_CODE",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::InvalidParent => "INVALID_PARENT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// Whether the caller can fix the request (4xx-class)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::StoreUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
