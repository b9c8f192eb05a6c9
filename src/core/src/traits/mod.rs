//! Shared traits for the Atlas platform

pub mod store;

// Re-export commonly used traits
pub use store::{RelationStore, StoreExt, Transaction, TransactionExt};
