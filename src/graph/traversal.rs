//! Ancestor-chain traversal.
//!
//! The hand-written recursive CTE lives here together with the dispatcher
//! that picks between it, the query-builder form
//! ([`crate::graph::builder`]) and the in-memory fixed-point
//! ([`crate::graph::memory`]). All of them return the start node at depth 0
//! followed by each ancestor up to the root, ordered by depth.

use rusqlite::params;
use tracing::{debug, instrument};

use crate::db::converters::row_to_ancestor;
use crate::error::{PedigreeError, Result};
use crate::graph::builder::{ancestor_records, ancestors_builder};
use crate::graph::memory::NodeIndex;
use crate::graph::store::NodeStore;
use crate::types::{AncestorRow, TraversalMethod};

/// Depth limit used when the caller has no configuration at hand.
pub const DEFAULT_MAX_DEPTH: u32 = 1024;

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const ANCESTORS_SQL: &str = "\
WITH RECURSIVE tree(node, id, name, parent_id) AS (
    -- Base: the starting node
    SELECT 0, base.id, base.name, base.parent_id
    FROM nodes AS base
    WHERE base.id = ?1

    UNION ALL

    -- Recursive: the parent of every row produced so far
    SELECT tree.node + 1, nodes.id, nodes.name, nodes.parent_id
    FROM nodes
    INNER JOIN tree ON nodes.id = tree.parent_id
    WHERE tree.node <= ?2
)
SELECT node, id, name, parent_id
FROM tree
ORDER BY node";

// ---------------------------------------------------------------------------
// Traversals
// ---------------------------------------------------------------------------

/// Ancestor chain of `start_id` using the literal `WITH RECURSIVE` query.
///
/// An unknown `start_id` yields an empty chain. A dangling `parent_id`
/// simply ends the chain.
#[instrument(level = "debug", skip(store))]
pub fn ancestors_raw(store: &NodeStore, start_id: i64, max_depth: u32) -> Result<Vec<AncestorRow>> {
    let mut stmt = store.conn.prepare_cached(ANCESTORS_SQL)?;
    let rows = stmt
        .query_map(params![start_id, max_depth], row_to_ancestor)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    check_depth(start_id, rows.iter().map(|r| r.node), max_depth)?;
    Ok(rows)
}

/// Ancestor chain of `start_id` computed with `method`.
///
/// Record output from [`TraversalMethod::Records`] is converted back to
/// typed rows so every method has the same return type.
pub fn ancestors(
    store: &NodeStore,
    start_id: i64,
    method: TraversalMethod,
    max_depth: u32,
) -> Result<Vec<AncestorRow>> {
    debug!(start_id, %method, max_depth, "ancestor traversal");
    match method {
        TraversalMethod::Raw => ancestors_raw(store, start_id, max_depth),
        TraversalMethod::Builder => ancestors_builder(store, start_id, max_depth),
        TraversalMethod::Records => ancestor_records(store, start_id, max_depth)?
            .iter()
            .map(AncestorRow::from_record)
            .collect(),
        TraversalMethod::Memory => NodeIndex::load(store)?.ancestors(start_id, max_depth),
    }
}

/// Look the start node up by name (oldest match), then traverse.
pub fn ancestors_by_name(
    store: &NodeStore,
    name: &str,
    method: TraversalMethod,
    max_depth: u32,
) -> Result<Vec<AncestorRow>> {
    let start = store.find_by_name(name)?;
    ancestors(store, start.id, method, max_depth)
}

/// Fail if any row went past `max_depth`.
///
/// The SQL forms let the recursion produce exactly one row beyond the
/// limit, so a chain that reaches it is distinguishable from one that
/// ended at a root.
pub(crate) fn check_depth(
    start_id: i64,
    mut depths: impl Iterator<Item = u32>,
    max_depth: u32,
) -> Result<()> {
    if depths.any(|d| d > max_depth) {
        return Err(PedigreeError::DepthLimitExceeded {
            start: start_id,
            limit: max_depth,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
