//! Multi-source config loading: YAML file, then environment, then CLI.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::schema::{check_max_depth, PedigreeConfig};
use crate::error::{PedigreeError, Result};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "pedigree.yaml";

/// Overrides `database.path`.
pub const ENV_DB: &str = "PEDIGREE_DB";
/// Overrides `traversal.max_depth`.
pub const ENV_MAX_DEPTH: &str = "PEDIGREE_MAX_DEPTH";

/// Read a config file. An empty file yields the defaults.
pub fn load_file(path: &Path) -> Result<PedigreeConfig> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(PedigreeConfig::default());
    }
    let config: PedigreeConfig = serde_yaml::from_str(&contents).map_err(|e| {
        PedigreeError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    check_max_depth(config.traversal.max_depth)?;
    Ok(config)
}

/// Resolve the effective configuration.
///
/// `explicit` must exist when given. Otherwise [`DEFAULT_CONFIG_FILE`] in
/// `cwd` is used if present. Environment overrides are applied last.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<PedigreeConfig> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(PedigreeError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "loading config");
            load_file(path)?
        }
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "loading config");
                load_file(&candidate)?
            } else {
                PedigreeConfig::default()
            }
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `PEDIGREE_*` overrides, reading variables through `lookup`.
pub fn apply_env_overrides<F>(config: &mut PedigreeConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(db) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
        config.database.path = PathBuf::from(db);
    }
    if let Some(depth) = lookup(ENV_MAX_DEPTH).filter(|v| !v.is_empty()) {
        let parsed = depth.trim().parse().map_err(|_| {
            PedigreeError::Config(format!("{ENV_MAX_DEPTH} must be a non-negative integer, got '{depth}'"))
        })?;
        config.traversal.max_depth = check_max_depth(parsed)?;
    }
    Ok(())
}
