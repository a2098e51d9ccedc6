//! Command execution for the `pedigree` binary.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::cli::args::{AncestorsArgs, Cli, Commands};
use crate::config::schema::check_max_depth;
use crate::config::{load_config, PedigreeConfig};
use crate::db::converters::sql_value_to_json;
use crate::error::{PedigreeError, Result};
use crate::fixtures::seed_cultivars;
use crate::graph::builder::{ancestor_records_query, ancestors_query};
use crate::graph::memory::NodeIndex;
use crate::graph::store::NodeStore;
use crate::graph::traversal::ancestors;
use crate::types::{AncestorRow, Node, TraversalMethod};

/// Resolve configuration from the CLI flags and the working directory.
pub fn resolve_config(cli: &Cli) -> Result<PedigreeConfig> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(cli.config.as_deref(), &cwd)?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    Ok(config)
}

/// Open the configured database, creating parent directories as needed.
pub fn open_store(path: &Path) -> Result<NodeStore> {
    let db_path = path.to_string_lossy();
    if db_path != ":memory:" {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(db = %db_path, "opening store");
    NodeStore::new(&db_path)
}

/// Run the parsed command, writing user-facing output to `out`.
pub fn execute_command(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(cli)?;
    let store = open_store(&config.database.path)?;
    run(&cli.command, &config, &store, out)
}

/// Run a command against an already-open store.
pub fn run(
    command: &Commands,
    config: &PedigreeConfig,
    store: &NodeStore,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::Init => {
            writeln!(out, "schema ready at {}", config.database.path.display())?;
        }
        Commands::Seed => {
            let nodes = seed_cultivars(store)?;
            for node in nodes.values() {
                write_node(out, node)?;
            }
        }
        Commands::Add { name, parent } => {
            let node = store.insert(name, *parent)?;
            write_node(out, &node)?;
        }
        Commands::Rename { id, name } => {
            store.rename(*id, name)?;
        }
        Commands::Reparent { id, parent } => {
            // Reparenting is the one mutation that can close a loop; roll
            // it back if it does.
            let tx = store.conn.unchecked_transaction()?;
            store.reparent(*id, *parent)?;
            NodeIndex::load(store)?.validate_acyclic()?;
            tx.commit()?;
        }
        Commands::Delete { id } => {
            if !store.delete(*id)? {
                return Err(PedigreeError::NotFound(format!("node {id}")));
            }
        }
        Commands::List { json } => {
            let nodes = store.all_nodes()?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&nodes)?)?;
            } else {
                for node in &nodes {
                    write_node(out, node)?;
                }
            }
        }
        Commands::Ancestors(args) => run_ancestors(args, config, store, out)?,
        Commands::Check => {
            let index = NodeIndex::load(store)?;
            index.validate_acyclic()?;
            writeln!(out, "ok: {} nodes, no cycles", index.len())?;
        }
        Commands::Sql {
            id,
            records,
            max_depth,
        } => {
            let max_depth = check_max_depth(max_depth.unwrap_or(config.traversal.max_depth))?;
            let query = if *records {
                ancestor_records_query(*id, max_depth)
            } else {
                ancestors_query(*id, max_depth)
            };
            let (sql, params) = query.to_sql()?;
            let params: Vec<serde_json::Value> = params.iter().map(sql_value_to_json).collect();
            writeln!(out, "{sql}")?;
            writeln!(out, "-- params: {}", serde_json::Value::Array(params))?;
        }
    }
    Ok(())
}

fn run_ancestors(
    args: &AncestorsArgs,
    config: &PedigreeConfig,
    store: &NodeStore,
    out: &mut impl Write,
) -> Result<()> {
    let start_id = match (&args.name, args.id) {
        (_, Some(id)) => id,
        (Some(name), None) => store.find_by_name(name)?.id,
        (None, None) => {
            return Err(PedigreeError::Other("either a name or --id is required".into()))
        }
    };
    let max_depth = check_max_depth(args.max_depth.unwrap_or(config.traversal.max_depth))?;

    let rows = if args.compare {
        compare_methods(store, start_id, max_depth)?
    } else {
        let method = args.method.unwrap_or(config.traversal.method);
        ancestors(store, start_id, method, max_depth)?
    };
    info!(start_id, rows = rows.len(), "ancestor chain computed");

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        for row in &rows {
            write_row(out, row)?;
        }
    }
    Ok(())
}

/// Run every method; return the common result or fail naming the first
/// method that disagrees with the raw query.
pub fn compare_methods(store: &NodeStore, start_id: i64, max_depth: u32) -> Result<Vec<AncestorRow>> {
    let expected = ancestors(store, start_id, TraversalMethod::Raw, max_depth)?;
    for method in TraversalMethod::ALL.into_iter().skip(1) {
        let got = ancestors(store, start_id, method, max_depth)?;
        if got != expected {
            return Err(PedigreeError::Other(format!(
                "{method} returned {} rows that differ from raw ({} rows)",
                got.len(),
                expected.len()
            )));
        }
    }
    Ok(expected)
}

fn write_node(out: &mut impl Write, node: &Node) -> Result<()> {
    match node.parent_id {
        Some(p) => writeln!(out, "{:>5}  {}  (parent {p})", node.id, node.name)?,
        None => writeln!(out, "{:>5}  {}  (root)", node.id, node.name)?,
    }
    Ok(())
}

fn write_row(out: &mut impl Write, row: &AncestorRow) -> Result<()> {
    let parent = row
        .parent_id
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(out, "{:>3}  {:>5}  {:<20}  {parent}", row.node, row.id, row.name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn exec(store: &NodeStore, argv: &[&str]) -> Result<String> {
        let mut full = vec!["pedigree"];
        full.extend_from_slice(argv);
        let cli = Cli::try_parse_from(full).unwrap();
        let mut buf = Vec::new();
        run(&cli.command, &PedigreeConfig::default(), store, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    fn seeded() -> NodeStore {
        let store = NodeStore::open_in_memory().unwrap();
        seed_cultivars(&store).unwrap();
        store
    }

    #[test]
    fn ancestors_table_output() {
        let store = seeded();
        let text = exec(&store, &["ancestors", "ShinanoGold"]).unwrap();
        let names: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().nth(2).unwrap())
            .collect();
        assert_eq!(names, vec!["ShinanoGold", "Senshu", "Toko"]);
    }

    #[test]
    fn ancestors_json_compare() {
        let store = seeded();
        let text = exec(&store, &["ancestors", "Kokko", "--compare", "--json"]).unwrap();
        let rows: Vec<AncestorRow> = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Kokko");
        assert_eq!(rows[0].node, 0);
    }

    #[test]
    fn reparent_into_cycle_is_reported() {
        let store = seeded();
        let toko = store.find_by_name("Toko").unwrap();
        let gold = store.find_by_name("ShinanoGold").unwrap();
        let err = exec(
            &store,
            &["reparent", &toko.id.to_string(), "--parent", &gold.id.to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, PedigreeError::CycleDetected { .. }), "got {err:?}");
        assert!(store.get_node(toko.id).unwrap().unwrap().is_root());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = seeded();
        assert!(matches!(
            exec(&store, &["delete", "9999"]),
            Err(PedigreeError::NotFound(_))
        ));
    }

    #[test]
    fn sql_command_prints_params() {
        let store = seeded();
        let text = exec(&store, &["sql", "3", "--max-depth", "5"]).unwrap();
        assert!(text.starts_with("WITH RECURSIVE tree("));
        assert!(text.trim_end().ends_with("-- params: [3,5]"), "{text}");
    }

    #[test]
    fn oversized_max_depth_flag_is_rejected() {
        let store = seeded();
        let err = exec(&store, &["ancestors", "Toko", "--max-depth", "2000000"]).unwrap_err();
        assert!(matches!(err, PedigreeError::Config(_)), "got {err:?}");
    }

    #[test]
    fn check_reports_node_count() {
        let store = seeded();
        assert_eq!(exec(&store, &["check"]).unwrap(), "ok: 8 nodes, no cycles\n");
    }

    #[test]
    fn open_store_creates_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/pedigree.db");
        let store = open_store(&path).unwrap();
        store.insert("Toko", None).unwrap();
        assert!(path.exists());
    }
}
