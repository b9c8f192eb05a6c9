//! Relation store adapters

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryRelationStore, InMemoryTransaction};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresRelationStore, PostgresTransaction};
