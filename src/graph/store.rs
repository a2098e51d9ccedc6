//! SQLite CRUD layer for the node table.
//!
//! Every statement goes through [`Connection::prepare_cached`], so repeated
//! lookups and traversals reuse compiled statements.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::converters::row_to_node;
use crate::db::schema::{apply_schema, initialize_database};
use crate::error::{PedigreeError, Result};
use crate::types::Node;

// ---------------------------------------------------------------------------
// NodeStore
// ---------------------------------------------------------------------------

/// Typed CRUD wrapper around the `nodes` table.
pub struct NodeStore {
    pub conn: Connection,
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const INSERT_NODE_SQL: &str = "\
INSERT INTO nodes (name, parent_id) VALUES (?1, ?2)
RETURNING id, name, parent_id";

const SELECT_NODE_SQL: &str = "SELECT id, name, parent_id FROM nodes WHERE id = ?1";

const SELECT_BY_NAME_SQL: &str = "\
SELECT id, name, parent_id FROM nodes WHERE name = ?1 ORDER BY id";

const SELECT_CHILDREN_SQL: &str = "\
SELECT id, name, parent_id FROM nodes WHERE parent_id = ?1 ORDER BY id";

const SELECT_ROOTS_SQL: &str = "\
SELECT id, name, parent_id FROM nodes WHERE parent_id IS NULL ORDER BY id";

const SELECT_ALL_SQL: &str = "SELECT id, name, parent_id FROM nodes ORDER BY id";

const RENAME_SQL: &str = "UPDATE nodes SET name = ?2 WHERE id = ?1";

const REPARENT_SQL: &str = "UPDATE nodes SET parent_id = ?2 WHERE id = ?1";

const DELETE_SQL: &str = "DELETE FROM nodes WHERE id = ?1";

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl NodeStore {
    /// Open (or create) the database at `db_path`, apply the schema, and
    /// return a ready-to-use store.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = initialize_database(db_path)?;
        Ok(Self { conn })
    }

    /// A fresh in-memory store with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    /// Wrap an already-open connection, applying the schema if missing.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Insert a node and return it with its assigned id.
    ///
    /// Fails with a foreign-key violation if `parent_id` names no row.
    pub fn insert(&self, name: &str, parent_id: Option<i64>) -> Result<Node> {
        let mut stmt = self.conn.prepare_cached(INSERT_NODE_SQL)?;
        let node = stmt.query_row(params![name, parent_id], row_to_node)?;
        info!(id = node.id, name, ?parent_id, "node inserted");
        Ok(node)
    }

    /// Change a node's display name.
    pub fn rename(&self, id: i64, name: &str) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(RENAME_SQL)?;
        let changed = stmt.execute(params![id, name])?;
        if changed == 0 {
            return Err(PedigreeError::NotFound(format!("node {id}")));
        }
        info!(id, name, "node renamed");
        Ok(())
    }

    /// Move a node under a new parent, or make it a root with `None`.
    ///
    /// No cycle check happens here; use
    /// [`NodeIndex::validate_acyclic`](crate::graph::memory::NodeIndex::validate_acyclic)
    /// when the caller cannot rule one out.
    pub fn reparent(&self, id: i64, parent_id: Option<i64>) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(REPARENT_SQL)?;
        let changed = stmt.execute(params![id, parent_id])?;
        if changed == 0 {
            return Err(PedigreeError::NotFound(format!("node {id}")));
        }
        info!(id, ?parent_id, "node reparented");
        Ok(())
    }

    /// Delete a node. Children are kept and become roots.
    ///
    /// Returns `false` when no row had that id.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(DELETE_SQL)?;
        let removed = stmt.execute(params![id])? > 0;
        if removed {
            info!(id, "node deleted");
        }
        Ok(removed)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Retrieve a single node by id, or `None` if it doesn't exist.
    pub fn get_node(&self, id: i64) -> Result<Option<Node>> {
        let mut stmt = self.conn.prepare_cached(SELECT_NODE_SQL)?;
        stmt.query_row(params![id], row_to_node)
            .optional()
            .map_err(Into::into)
    }

    /// Get every node whose `name` matches, oldest first.
    pub fn get_nodes_by_name(&self, name: &str) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(SELECT_BY_NAME_SQL)?;
        let rows = stmt.query_map(params![name], row_to_node)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// The oldest node called `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Node> {
        debug!(name, "looking up node by name");
        self.get_nodes_by_name(name)?
            .into_iter()
            .next()
            .ok_or_else(|| PedigreeError::NotFound(format!("node named '{name}'")))
    }

    /// Direct children of `id`.
    pub fn children(&self, id: i64) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(SELECT_CHILDREN_SQL)?;
        let rows = stmt.query_map(params![id], row_to_node)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Every node without a parent.
    pub fn roots(&self) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(SELECT_ROOTS_SQL)?;
        let rows = stmt.query_map([], row_to_node)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// All nodes ordered by id.
    pub fn all_nodes(&self) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(SELECT_ALL_SQL)?;
        let rows = stmt.query_map([], row_to_node)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
