//! SQLite schema initialization for pedigree.
//!
//! A single self-referential table. The parent reference is a real foreign
//! key with `ON DELETE SET NULL`, so deleting a node orphans its children
//! into roots instead of removing them.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants
// ---------------------------------------------------------------------------

const CREATE_NODES: &str = "\
CREATE TABLE IF NOT EXISTS nodes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  parent_id INTEGER NULL REFERENCES nodes(id) ON DELETE SET NULL
)";

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the schema.
///
/// The returned connection has foreign keys enforced (required for the
/// `SET NULL` behaviour), WAL journaling and synchronous NORMAL.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    apply_schema(&conn)?;
    tracing::debug!(db_path, "schema applied");
    Ok(conn)
}

/// Apply pragmas and DDL to an already-open connection. Idempotent.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    // -- Pragmas ----------------------------------------------------------
    // In-memory databases silently keep journal_mode=memory.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // -- Tables -----------------------------------------------------------
    conn.execute_batch(CREATE_NODES)?;

    // -- Indexes ----------------------------------------------------------
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
