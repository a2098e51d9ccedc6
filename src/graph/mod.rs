//! Graph layer: SQLite-backed node store and ancestor traversals.

pub mod builder;
pub mod memory;
pub mod store;
pub mod traversal;
