//! Reference data: two small apple-cultivar pedigrees.
//!
//! ```text
//! Toko ── Senshu ─┬─ ShinanoGold ── OkushuRoman
//!                 └─ Akibae
//! Kokko ── Fuji ── ShinanoSweet
//! ```

use std::collections::BTreeMap;

use tracing::info;

use crate::error::Result;
use crate::graph::store::NodeStore;
use crate::types::Node;

/// `(name, parent name)` in insertion order; parents always come first.
pub const CULTIVARS: &[(&str, Option<&str>)] = &[
    ("Toko", None),
    ("Senshu", Some("Toko")),
    ("ShinanoGold", Some("Senshu")),
    ("OkushuRoman", Some("ShinanoGold")),
    ("Akibae", Some("Senshu")),
    ("Kokko", None),
    ("Fuji", Some("Kokko")),
    ("ShinanoSweet", Some("Fuji")),
];

/// Insert [`CULTIVARS`] and return the created nodes keyed by name.
///
/// Seeding twice creates a second, independent copy of both pedigrees.
pub fn seed_cultivars(store: &NodeStore) -> Result<BTreeMap<&'static str, Node>> {
    let mut created: BTreeMap<&'static str, Node> = BTreeMap::new();
    let tx = store.conn.unchecked_transaction()?;
    for (name, parent) in CULTIVARS {
        let parent_id = parent.and_then(|p| created.get(p)).map(|n| n.id);
        let node = store.insert(name, parent_id)?;
        created.insert(*name, node);
    }
    tx.commit()?;
    info!(count = created.len(), "seeded cultivar pedigrees");
    Ok(created)
}
