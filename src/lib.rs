//! pedigree: ancestor chains over a self-referential SQLite table.
//!
//! Stores nodes with an optional parent and answers "this node and all of
//! its ancestors, nearest first" with a literal recursive CTE, the same CTE
//! composed through a small query builder, or an in-memory fixed-point.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod graph;
pub mod observability;
pub mod types;

pub use error::{PedigreeError, Result};
pub use graph::store::NodeStore;
pub use graph::traversal::{ancestors, ancestors_by_name, ancestors_raw};
pub use types::{AncestorRow, Node, Record, TraversalMethod};
