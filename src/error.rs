//! Error type shared by the store, the traversals and the CLI.

use thiserror::Error;

/// Everything that can go wrong inside pedigree.
///
/// Database failures are passed through untouched in [`PedigreeError::Sqlite`];
/// a traversal whose start id does not exist is *not* an error (it yields an
/// empty chain).
#[derive(Debug, Error)]
pub enum PedigreeError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cycle detected: ancestor chain of node {start} revisits node {repeated}")]
    CycleDetected { start: i64, repeated: i64 },

    #[error("ancestor chain of node {start} is deeper than the limit of {limit}")]
    DepthLimitExceeded { start: i64, limit: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PedigreeError>;
