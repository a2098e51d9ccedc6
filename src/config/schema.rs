//! Configuration data structures for pedigree.
//!
//! Defines the YAML config format. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PedigreeError, Result};
use crate::graph::traversal::DEFAULT_MAX_DEPTH;
use crate::types::TraversalMethod;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for pedigree.
///
/// Loaded from YAML, then overridden by environment variables and CLI
/// flags (see [`crate::config::loader`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PedigreeConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub traversal: TraversalConfig,
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; `:memory:` is accepted.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// `<platform data dir>/pedigree.db`, or `pedigree.db` in the working
/// directory when no home directory can be determined.
fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "pedigree")
        .map(|dirs| dirs.data_dir().join("pedigree.db"))
        .unwrap_or_else(|| PathBuf::from("pedigree.db"))
}

// ---------------------------------------------------------------------------
// TraversalConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Deepest ancestor a traversal may return before it is treated as a
    /// cycle.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Formulation used when the CLI is not told otherwise.
    #[serde(default)]
    pub method: TraversalMethod,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            method: TraversalMethod::default(),
        }
    }
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

/// Largest `max_depth` accepted from a file, the environment or a flag.
///
/// A cyclic chain makes the SQL traversals materialize `max_depth` rows
/// before failing, so the limit has to stay small enough to fit in memory.
pub const MAX_DEPTH_CEILING: u32 = 1_000_000;

/// Return `depth` unchanged, or a config error above [`MAX_DEPTH_CEILING`].
pub fn check_max_depth(depth: u32) -> Result<u32> {
    if depth > MAX_DEPTH_CEILING {
        return Err(PedigreeError::Config(format!(
            "max_depth {depth} exceeds the ceiling of {MAX_DEPTH_CEILING}"
        )));
    }
    Ok(depth)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_yaml_is_default() {
        let config: PedigreeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PedigreeConfig::default());
        assert_eq!(config.traversal.max_depth, 1024);
        assert_eq!(config.traversal.method, TraversalMethod::Builder);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "traversal:\n  method: memory\n";
        let config: PedigreeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.traversal.method, TraversalMethod::Memory);
        assert_eq!(config.traversal.max_depth, 1024);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn full_yaml() {
        let yaml = "\
database:
  path: /tmp/apples.db
traversal:
  max_depth: 8
  method: raw
";
        let config: PedigreeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/apples.db"));
        assert_eq!(config.traversal.max_depth, 8);
        assert_eq!(config.traversal.method, TraversalMethod::Raw);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let yaml = "traversal:\n  method: graphql\n";
        let result: std::result::Result<PedigreeConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn default_path_ends_with_db_file() {
        assert!(default_db_path().ends_with("pedigree.db"));
    }

    #[test]
    fn max_depth_ceiling_is_inclusive() {
        assert_eq!(check_max_depth(MAX_DEPTH_CEILING).unwrap(), MAX_DEPTH_CEILING);
        assert!(matches!(
            check_max_depth(MAX_DEPTH_CEILING + 1),
            Err(PedigreeError::Config(_))
        ));
    }
}
