//! In-memory ancestor traversal.
//!
//! Loads the table into an `id -> node` map and walks parent links
//! iteratively. Unlike the SQL forms, which can only notice a cycle by
//! running into the depth limit, this walk remembers every id it has
//! visited and reports the exact node where the chain loops.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::error::{PedigreeError, Result};
use crate::graph::store::NodeStore;
use crate::types::{AncestorRow, Node};

/// Arena of nodes keyed by id.
#[derive(Debug, Default, Clone)]
pub struct NodeIndex {
    nodes: HashMap<i64, Node>,
}

impl NodeIndex {
    /// Snapshot every row of the store.
    pub fn load(store: &NodeStore) -> Result<Self> {
        let index: Self = store.all_nodes()?.into_iter().collect();
        debug!(nodes = index.len(), "node index loaded");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start node at depth 0, then each parent until a root or a dangling
    /// reference.
    ///
    /// # Errors
    ///
    /// [`PedigreeError::CycleDetected`] if a node is reached twice;
    /// [`PedigreeError::DepthLimitExceeded`] if the chain needs a row deeper
    /// than `max_depth`.
    #[instrument(level = "debug", skip(self))]
    pub fn ancestors(&self, start_id: i64, max_depth: u32) -> Result<Vec<AncestorRow>> {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&start_id);
        let mut depth: u32 = 0;

        while let Some(node) = current {
            if !seen.insert(node.id) {
                return Err(PedigreeError::CycleDetected {
                    start: start_id,
                    repeated: node.id,
                });
            }
            if depth > max_depth {
                return Err(PedigreeError::DepthLimitExceeded {
                    start: start_id,
                    limit: max_depth,
                });
            }
            rows.push(AncestorRow::from_node(node, depth));
            current = node.parent_id.and_then(|p| self.nodes.get(&p));
            depth += 1;
        }
        Ok(rows)
    }

    /// Verify that no parent chain in the index loops.
    ///
    /// Nodes whose chain is already known to reach a root are remembered, so
    /// the whole check is linear in the number of nodes.
    pub fn validate_acyclic(&self) -> Result<()> {
        let mut settled: HashSet<i64> = HashSet::with_capacity(self.nodes.len());
        let mut ids: Vec<i64> = self.nodes.keys().copied().collect();
        ids.sort_unstable();

        for start in ids {
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            let mut current = Some(start);
            while let Some(id) = current {
                if settled.contains(&id) {
                    break;
                }
                if !on_path.insert(id) {
                    return Err(PedigreeError::CycleDetected {
                        start,
                        repeated: id,
                    });
                }
                path.push(id);
                current = self
                    .nodes
                    .get(&id)
                    .and_then(|n| n.parent_id)
                    .filter(|p| self.nodes.contains_key(p));
            }
            settled.extend(path);
        }
        Ok(())
    }
}

impl FromIterator<Node> for NodeIndex {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(|n| (n.id, n)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: i64, name: &str, parent_id: Option<i64>) -> Node {
        Node {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    fn apples() -> NodeIndex {
        [
            node(1, "Toko", None),
            node(2, "Senshu", Some(1)),
            node(3, "ShinanoGold", Some(2)),
            node(4, "OkushuRoman", Some(3)),
            node(5, "Akibae", Some(2)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn walks_up_to_root() {
        let rows = apples().ancestors(4, 100).unwrap();
        let got: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            got,
            vec!["OkushuRoman@0", "ShinanoGold@1", "Senshu@2", "Toko@3"]
        );
    }

    #[test]
    fn root_alone() {
        let rows = apples().ancestors(1, 100).unwrap();
        assert_eq!(rows, vec![AncestorRow::from_node(&node(1, "Toko", None), 0)]);
    }

    #[test]
    fn missing_start_is_empty() {
        assert!(apples().ancestors(42, 100).unwrap().is_empty());
    }

    #[test]
    fn dangling_parent_ends_chain() {
        let index: NodeIndex = [node(7, "Orin", Some(99))].into_iter().collect();
        let rows = index.ancestors(7, 100).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parent_id, Some(99));
        index.validate_acyclic().unwrap();
    }

    #[test]
    fn cycle_is_reported_with_repeated_id() {
        let index: NodeIndex = [
            node(1, "a", Some(3)),
            node(2, "b", Some(1)),
            node(3, "c", Some(2)),
        ]
        .into_iter()
        .collect();
        let err = index.ancestors(2, 100).unwrap_err();
        assert!(
            matches!(err, PedigreeError::CycleDetected { start: 2, repeated: 2 }),
            "got {err:?}"
        );
        assert!(matches!(
            index.validate_acyclic(),
            Err(PedigreeError::CycleDetected { start: 1, repeated: 1 })
        ));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let index: NodeIndex = [node(1, "loop", Some(1))].into_iter().collect();
        assert!(matches!(
            index.ancestors(1, 100),
            Err(PedigreeError::CycleDetected { .. })
        ));
    }

    #[test]
    fn depth_limit_applies() {
        let err = apples().ancestors(4, 2).unwrap_err();
        assert!(matches!(
            err,
            PedigreeError::DepthLimitExceeded { start: 4, limit: 2 }
        ));
    }

    #[test]
    fn forest_validates() {
        apples().validate_acyclic().unwrap();
        NodeIndex::default().validate_acyclic().unwrap();
    }
}
