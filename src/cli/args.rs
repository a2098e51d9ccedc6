//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::types::TraversalMethod;

/// Ancestor-chain lookups over a self-referential SQLite tree table
#[derive(Parser, Debug)]
#[command(name = "pedigree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database file (overrides config and PEDIGREE_DB)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// YAML config file (default: ./pedigree.yaml if present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Raise log level (-v info, -vv debug incl. SQL, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema
    Init,

    /// Insert the reference cultivar pedigrees
    Seed,

    /// Insert a node
    Add {
        name: String,
        /// Parent node id (omit for a root)
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Rename a node
    Rename { id: i64, name: String },

    /// Move a node under another parent (omit --parent to make it a root)
    Reparent {
        id: i64,
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Delete a node; its children become roots
    Delete { id: i64 },

    /// List all nodes
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show a node and all of its ancestors, nearest first
    Ancestors(AncestorsArgs),

    /// Verify that no parent chain loops
    Check,

    /// Print the ancestor query built by the query builder
    Sql {
        /// Starting node id
        id: i64,
        /// Use the values() projection used for record output
        #[arg(long)]
        records: bool,
        #[arg(long)]
        max_depth: Option<u32>,
    },
}

#[derive(Args, Debug)]
pub struct AncestorsArgs {
    /// Starting node name (oldest match wins)
    #[arg(required_unless_present = "id", conflicts_with = "id")]
    pub name: Option<String>,

    /// Starting node id
    #[arg(long)]
    pub id: Option<i64>,

    /// raw | builder | records | memory (default from config)
    #[arg(short, long, value_parser = parse_method)]
    pub method: Option<TraversalMethod>,

    /// Reject chains deeper than this (default from config)
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Run every method and fail unless they agree
    #[arg(long, conflicts_with = "method")]
    pub compare: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn parse_method(s: &str) -> Result<TraversalMethod, String> {
    TraversalMethod::from_str_loose(s)
        .ok_or_else(|| format!("unknown method '{s}' (expected raw, builder, records or memory)"))
}
