//! Row → domain type conversion for `rusqlite` result sets.

use rusqlite::types::{Value, ValueRef};
use rusqlite::Row;

use crate::error::{PedigreeError, Result};
use crate::types::{AncestorRow, Node, Record};

/// Map a `nodes` row (selected by column name) to a [`Node`].
pub fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
    })
}

/// Map a traversal row (`node, id, name, parent_id`) to an [`AncestorRow`].
pub fn row_to_ancestor(row: &Row<'_>) -> rusqlite::Result<AncestorRow> {
    Ok(AncestorRow {
        node: row.get("node")?,
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
    })
}

/// Map an arbitrary row to a [`Record`] keyed by the statement's column names.
pub fn row_to_record(row: &Row<'_>, columns: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for (i, name) in columns.iter().enumerate() {
        let value = value_to_json(row.get_ref(i)?)?;
        record.insert(name.clone(), value);
    }
    Ok(record)
}

fn value_to_json(value: ValueRef<'_>) -> Result<serde_json::Value> {
    Ok(match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(bytes) => serde_json::Value::from(
            std::str::from_utf8(bytes)
                .map_err(|e| PedigreeError::Other(format!("non-utf8 text column: {e}")))?,
        ),
        ValueRef::Blob(_) => {
            return Err(PedigreeError::Other(
                "blob columns cannot be projected into records".into(),
            ))
        }
    })
}

/// Convert an owned SQL value into JSON, used when echoing bound parameters.
pub fn sql_value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Value::from(*f),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(format!("<{} bytes>", b.len())),
    }
}
