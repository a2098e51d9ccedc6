//! Core domain types for pedigree.
//!
//! A [`Node`] is one row of the self-referential `nodes` table. Traversals
//! return [`AncestorRow`]s (typed) or [`Record`]s (plain key/value maps).

use serde::{Deserialize, Serialize};

use crate::error::{PedigreeError, Result};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One entry in a parent/child hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    /// `None` marks a root.
    pub parent_id: Option<i64>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// AncestorRow
// ---------------------------------------------------------------------------

/// A node annotated with its distance from the traversal's starting node.
///
/// `node` is the zero-based depth: 0 is the start node itself, 1 its parent,
/// and so on up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorRow {
    pub node: u32,
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

impl AncestorRow {
    pub fn from_node(node: &Node, depth: u32) -> Self {
        Self {
            node: depth,
            id: node.id,
            name: node.name.clone(),
            parent_id: node.parent_id,
        }
    }

    /// Project into a plain key/value [`Record`].
    pub fn to_record(&self) -> Record {
        let mut map = Record::new();
        map.insert("node".to_string(), serde_json::Value::from(self.node));
        map.insert("id".to_string(), serde_json::Value::from(self.id));
        map.insert("name".to_string(), serde_json::Value::from(self.name.as_str()));
        map.insert(
            "parent_id".to_string(),
            self.parent_id
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
        );
        map
    }

    /// Rebuild a typed row from a projected [`Record`].
    pub fn from_record(record: &Record) -> Result<Self> {
        let int = |key: &str| -> Result<i64> {
            record
                .get(key)
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| PedigreeError::Other(format!("record is missing integer '{key}'")))
        };
        let node = record_depth(record)?;
        let name = record
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| PedigreeError::Other("record is missing 'name'".into()))?
            .to_string();
        let parent_id = match record.get("parent_id") {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(
                v.as_i64()
                    .ok_or_else(|| PedigreeError::Other("record 'parent_id' is not an integer".into()))?,
            ),
        };
        Ok(Self {
            node,
            id: int("id")?,
            name,
            parent_id,
        })
    }
}

/// The `node` depth of a projected [`Record`].
pub fn record_depth(record: &Record) -> Result<u32> {
    let depth = record
        .get("node")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| PedigreeError::Other("record is missing integer 'node'".into()))?;
    u32::try_from(depth).map_err(|_| PedigreeError::Other("record depth out of range".into()))
}

impl std::fmt::Display for AncestorRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.node)
    }
}

/// A traversal row projected into column-name → value pairs.
pub type Record = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// TraversalMethod
// ---------------------------------------------------------------------------

/// The interchangeable ways of computing an ancestor chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMethod {
    /// Hand-written `WITH RECURSIVE` SQL.
    Raw,
    /// CTE composed with the query builder, typed rows.
    #[default]
    Builder,
    /// CTE composed with the query builder, projected into records.
    Records,
    /// Iterative fixed-point over an in-memory index.
    Memory,
}

impl TraversalMethod {
    pub const ALL: [TraversalMethod; 4] = [Self::Raw, Self::Builder, Self::Records, Self::Memory];

    /// Parse from a loose string (case-insensitive, a few aliases accepted).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "sql" => Some(Self::Raw),
            "builder" | "cte" => Some(Self::Builder),
            "records" | "dict" | "values" => Some(Self::Records),
            "memory" | "mem" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Builder => "builder",
            Self::Records => "records",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for TraversalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
