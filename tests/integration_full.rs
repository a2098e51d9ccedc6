//! End-to-end tests for ancestor traversal over the cultivar pedigrees.
//!
//! Each test seeds a fresh on-disk database and checks the chain through
//! every formulation.

use pedigree::fixtures::seed_cultivars;
use pedigree::graph::builder::{ancestor_records, ancestors_builder};
use pedigree::graph::memory::NodeIndex;
use pedigree::graph::traversal::{ancestors, ancestors_raw, DEFAULT_MAX_DEPTH};
use pedigree::{AncestorRow, NodeStore, PedigreeError, TraversalMethod};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (TempDir, NodeStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pedigree.db");
    let store = NodeStore::new(path.to_str().unwrap()).unwrap();
    seed_cultivars(&store).unwrap();
    (dir, store)
}

fn names_and_depths(rows: &[AncestorRow]) -> Vec<(String, u32)> {
    rows.iter().map(|r| (r.name.clone(), r.node)).collect()
}

fn all_methods(store: &NodeStore, start_id: i64) -> Vec<Vec<AncestorRow>> {
    TraversalMethod::ALL
        .iter()
        .map(|m| ancestors(store, start_id, *m, DEFAULT_MAX_DEPTH).unwrap())
        .collect()
}

// ===========================================================================
// 1. Reference scenario
// ===========================================================================

#[test]
fn raw_query_shinano_gold() {
    let (_dir, store) = setup();
    let gold = store.find_by_name("ShinanoGold").unwrap();
    let rows = ancestors_raw(&store, gold.id, DEFAULT_MAX_DEPTH).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(
        names_and_depths(&rows),
        vec![
            ("ShinanoGold".to_string(), 0),
            ("Senshu".to_string(), 1),
            ("Toko".to_string(), 2),
        ]
    );
}

#[test]
fn builder_matches_raw_query() {
    let (_dir, store) = setup();
    let gold = store.find_by_name("ShinanoGold").unwrap();
    let raw = ancestors_raw(&store, gold.id, DEFAULT_MAX_DEPTH).unwrap();
    let built = ancestors_builder(&store, gold.id, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(built, raw);
}

#[test]
fn builder_from_root_returns_only_root() {
    let (_dir, store) = setup();
    let kokko = store.find_by_name("Kokko").unwrap();
    let rows = ancestors_builder(&store, kokko.id, DEFAULT_MAX_DEPTH).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].node, 0);
    assert_eq!(rows[0].name, "Kokko");
    assert_eq!(rows[0].parent_id, None);
}

#[test]
fn records_projection_carries_same_values() {
    let (_dir, store) = setup();
    let gold = store.find_by_name("ShinanoGold").unwrap();
    let records = ancestor_records(&store, gold.id, DEFAULT_MAX_DEPTH).unwrap();

    assert_eq!(records.len(), 3);
    let expected = [("ShinanoGold", 0), ("Senshu", 1), ("Toko", 2)];
    for (record, (name, depth)) in records.iter().zip(expected) {
        assert_eq!(record["node"], serde_json::json!(depth));
        assert_eq!(record["name"], serde_json::json!(name));
    }
    let mut keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "name", "node", "parent_id"]);
}

#[test]
fn every_node_agrees_across_methods() {
    let (_dir, store) = setup();
    for node in store.all_nodes().unwrap() {
        let results = all_methods(&store, node.id);
        for (method, rows) in TraversalMethod::ALL.iter().zip(&results) {
            assert_eq!(rows, &results[0], "{method} disagrees for {}", node.name);
        }
        assert_eq!(results[0][0].id, node.id);
    }
}

#[test]
fn leaf_and_sibling_chains() {
    let (_dir, store) = setup();
    let roman = store.find_by_name("OkushuRoman").unwrap();
    let akibae = store.find_by_name("Akibae").unwrap();
    let sweet = store.find_by_name("ShinanoSweet").unwrap();

    let roman_rows = ancestors_raw(&store, roman.id, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(
        roman_rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["OkushuRoman", "ShinanoGold", "Senshu", "Toko"]
    );
    let akibae_rows = ancestors_raw(&store, akibae.id, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(
        akibae_rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["Akibae", "Senshu", "Toko"]
    );
    let sweet_rows = ancestors_raw(&store, sweet.id, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(
        sweet_rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["ShinanoSweet", "Fuji", "Kokko"]
    );
}

// ===========================================================================
// 2. Mutations
// ===========================================================================

#[test]
fn deleting_parent_truncates_chain_without_removing_children() {
    let (_dir, store) = setup();
    let senshu = store.find_by_name("Senshu").unwrap();
    let gold = store.find_by_name("ShinanoGold").unwrap();
    let before = store.count().unwrap();

    assert!(store.delete(senshu.id).unwrap());
    assert_eq!(store.count().unwrap(), before - 1);

    for rows in all_methods(&store, gold.id) {
        assert_eq!(names_and_depths(&rows), vec![("ShinanoGold".to_string(), 0)]);
    }
    assert!(store.find_by_name("Akibae").unwrap().is_root());
}

#[test]
fn reparent_changes_chain() {
    let (_dir, store) = setup();
    let fuji = store.find_by_name("Fuji").unwrap();
    let senshu = store.find_by_name("Senshu").unwrap();
    let sweet = store.find_by_name("ShinanoSweet").unwrap();

    store.reparent(fuji.id, Some(senshu.id)).unwrap();
    let rows = ancestors_raw(&store, sweet.id, DEFAULT_MAX_DEPTH).unwrap();
    assert_eq!(
        rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["ShinanoSweet", "Fuji", "Senshu", "Toko"]
    );
}

#[test]
fn unknown_start_is_empty_everywhere() {
    let (_dir, store) = setup();
    for rows in all_methods(&store, 10_000) {
        assert!(rows.is_empty());
    }
}

#[test]
fn dangling_parent_ends_chain_in_every_method() {
    let dir = TempDir::new().unwrap();
    let conn = rusqlite::Connection::open(dir.path().join("legacy.db")).unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys=OFF;
         CREATE TABLE nodes (
           id INTEGER PRIMARY KEY AUTOINCREMENT,
           name TEXT NOT NULL,
           parent_id INTEGER NULL REFERENCES nodes(id) ON DELETE SET NULL
         );
         INSERT INTO nodes (id, name, parent_id) VALUES (1, 'a', 99), (2, 'b', 1);",
    )
    .unwrap();
    let store = NodeStore::from_connection(conn).unwrap();

    for method in TraversalMethod::ALL {
        let rows = ancestors(&store, 2, method, DEFAULT_MAX_DEPTH).unwrap();
        let got: Vec<(u32, i64)> = rows.iter().map(|r| (r.node, r.id)).collect();
        assert_eq!(got, vec![(0, 2), (1, 1)], "{method}");
        assert_eq!(rows[1].parent_id, Some(99), "{method}");
    }
}

// ===========================================================================
// 3. Cycles
// ===========================================================================

#[test]
fn cycle_hits_depth_limit_in_sql_and_is_named_in_memory() {
    let (_dir, store) = setup();
    let toko = store.find_by_name("Toko").unwrap();
    let gold = store.find_by_name("ShinanoGold").unwrap();
    store.reparent(toko.id, Some(gold.id)).unwrap();

    for method in [TraversalMethod::Raw, TraversalMethod::Builder, TraversalMethod::Records] {
        let err = ancestors(&store, gold.id, method, 50).unwrap_err();
        assert!(
            matches!(err, PedigreeError::DepthLimitExceeded { limit: 50, .. }),
            "{method}: {err:?}"
        );
    }

    let err = ancestors(&store, gold.id, TraversalMethod::Memory, 50).unwrap_err();
    assert!(
        matches!(err, PedigreeError::CycleDetected { repeated, .. } if repeated == gold.id),
        "{err:?}"
    );
    assert!(NodeIndex::load(&store).unwrap().validate_acyclic().is_err());

    // Nodes outside the loop are unaffected.
    let kokko = store.find_by_name("Kokko").unwrap();
    assert_eq!(all_methods(&store, kokko.id)[0].len(), 1);
}

#[test]
fn reopened_database_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pedigree.db");
    {
        let store = NodeStore::new(path.to_str().unwrap()).unwrap();
        seed_cultivars(&store).unwrap();
    }
    let store = NodeStore::new(path.to_str().unwrap()).unwrap();
    assert_eq!(store.count().unwrap(), 8);
    let gold = store.find_by_name("ShinanoGold").unwrap();
    assert_eq!(ancestors_raw(&store, gold.id, DEFAULT_MAX_DEPTH).unwrap().len(), 3);
}
