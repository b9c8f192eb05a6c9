//! # Atlas Core
//!
//! Shared entity types, the error taxonomy, and the relation store traits
//! consumed by the access-control and taxonomy engine.

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{AtlasError, ErrorKind, Result};
pub use traits::{RelationStore, StoreExt, Transaction, TransactionExt};
pub use types::{EntityKind, Filter, Id, Record, Relation};
