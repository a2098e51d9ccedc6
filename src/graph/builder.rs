//! A small composable SQL builder for recursive common table expressions.
//!
//! Just enough relational algebra to describe "seed rows, then repeatedly
//! join the table against the rows produced so far": a [`Select`] per term,
//! glued together by [`With::recursive`], and an outer [`CteQuery`] that
//! reads the CTE back. Rendering produces SQLite SQL with numbered `?N`
//! placeholders and the matching bound values.
//!
//! ```ignore
//! let cte = With::recursive("tree", |cte| {
//!     Select::table(&NODES)
//!         .filter_eq("id", start_id)
//!         .annotate("node", Expr::int(0))
//!         .union_all(
//!             Select::table(&NODES)
//!                 .join_cte(cte, "id", "parent_id")
//!                 .annotate("node", cte.col("node").plus(1)),
//!         )
//! });
//! let rows = fetch_typed(&store, &cte.queryset().order_by("node"))?;
//! ```

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::debug;

use crate::db::converters::{row_to_ancestor, row_to_record};
use crate::error::{PedigreeError, Result};
use crate::graph::store::NodeStore;
use crate::graph::traversal::check_depth;
use crate::types::{record_depth, AncestorRow, Record};

// ---------------------------------------------------------------------------
// Table descriptors
// ---------------------------------------------------------------------------

/// A table and the columns selected when no explicit projection is given.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// The self-referential `nodes` table.
pub const NODES: Table = Table {
    name: "nodes",
    columns: &["id", "name", "parent_id"],
};

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        qualifier: String,
        name: String,
    },
    Int(i64),
    Param(Value),
    Add(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn qualified(qualifier: &str, name: &str) -> Self {
        Self::Column {
            qualifier: qualifier.to_string(),
            name: name.to_string(),
        }
    }

    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn param(value: impl Into<Value>) -> Self {
        Self::Param(value.into())
    }

    /// `self + n`
    pub fn plus(self, n: i64) -> Self {
        Self::Add(Box::new(self), Box::new(Self::Int(n)))
    }

    pub fn le(self, other: Expr) -> Predicate {
        Predicate::Le(self, other)
    }

    pub fn equals(self, other: Expr) -> Predicate {
        Predicate::Eq(self, other)
    }

    fn render(&self, out: &mut String, params: &mut Vec<Value>) -> Result<()> {
        match self {
            Self::Column { qualifier, name } => {
                out.push_str(ident(qualifier)?);
                out.push('.');
                out.push_str(ident(name)?);
            }
            Self::Int(v) => out.push_str(&v.to_string()),
            Self::Param(v) => {
                params.push(v.clone());
                out.push('?');
                out.push_str(&params.len().to_string());
            }
            Self::Add(lhs, rhs) => {
                lhs.render(out, params)?;
                out.push_str(" + ");
                rhs.render(out, params)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Expr, Expr),
    Le(Expr, Expr),
}

impl Predicate {
    fn render(&self, out: &mut String, params: &mut Vec<Value>) -> Result<()> {
        let (lhs, op, rhs) = match self {
            Self::Eq(l, r) => (l, " = ", r),
            Self::Le(l, r) => (l, " <= ", r),
        };
        lhs.render(out, params)?;
        out.push_str(op);
        rhs.render(out, params)
    }
}

/// Identifiers are interpolated, so only plain names are accepted.
fn ident(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(PedigreeError::Other(format!("invalid SQL identifier '{name}'")))
    }
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Field {
    expr: Expr,
    alias: String,
}

#[derive(Debug, Clone)]
struct Join {
    cte: String,
    on: Predicate,
}

/// One `SELECT … FROM table [JOIN cte] [WHERE …]` term.
#[derive(Debug, Clone)]
pub struct Select {
    table: Table,
    values: Option<Vec<String>>,
    annotations: Vec<Field>,
    join: Option<Join>,
    filters: Vec<Predicate>,
}

impl Select {
    pub fn table(table: &Table) -> Self {
        Self {
            table: *table,
            values: None,
            annotations: Vec::new(),
            join: None,
            filters: Vec::new(),
        }
    }

    /// A column of this select's table.
    pub fn field(&self, column: &str) -> Expr {
        Expr::qualified(self.table.name, column)
    }

    /// `WHERE table.column = ?`
    pub fn filter_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        let lhs = self.field(column);
        self.filters.push(lhs.equals(Expr::param(value)));
        self
    }

    /// Arbitrary extra `WHERE` predicate, ANDed with the others.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// `INNER JOIN cte ON table.left = cte.right`
    pub fn join_cte(mut self, cte: &CteRef, left: &str, right: &str) -> Self {
        let on = self.field(left).equals(cte.col(right));
        self.join = Some(Join {
            cte: cte.name.clone(),
            on,
        });
        self
    }

    /// Project an extra computed column.
    pub fn annotate(mut self, alias: &str, expr: Expr) -> Self {
        self.annotations.push(Field {
            expr,
            alias: alias.to_string(),
        });
        self
    }

    /// Replace the table's default columns with an explicit list.
    pub fn values(mut self, columns: &[&str]) -> Self {
        self.values = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn union_all(self, recursive: Select) -> Compound {
        Compound {
            anchor: self,
            recursive,
        }
    }

    fn fields(&self) -> Vec<Field> {
        let columns: Vec<String> = match &self.values {
            Some(v) => v.clone(),
            None => self.table.columns.iter().map(|c| c.to_string()).collect(),
        };
        columns
            .into_iter()
            .map(|c| Field {
                expr: self.field(&c),
                alias: c,
            })
            .chain(self.annotations.iter().cloned())
            .collect()
    }

    /// Output column names, in projection order.
    pub fn column_names(&self) -> Vec<String> {
        self.fields().into_iter().map(|f| f.alias).collect()
    }

    fn render(&self, out: &mut String, params: &mut Vec<Value>) -> Result<()> {
        out.push_str("SELECT ");
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            field.expr.render(out, params)?;
            out.push_str(" AS ");
            out.push_str(ident(&field.alias)?);
        }
        out.push_str(" FROM ");
        out.push_str(ident(self.table.name)?);
        if let Some(join) = &self.join {
            out.push_str(" INNER JOIN ");
            out.push_str(ident(&join.cte)?);
            out.push_str(" ON ");
            join.on.render(out, params)?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            out.push_str(if i == 0 { " WHERE " } else { " AND " });
            filter.render(out, params)?;
        }
        Ok(())
    }
}

/// Anchor term plus recursive term of a recursive CTE.
#[derive(Debug, Clone)]
pub struct Compound {
    anchor: Select,
    recursive: Select,
}

// ---------------------------------------------------------------------------
// With / CteQuery
// ---------------------------------------------------------------------------

/// Handle to the CTE under construction, for use inside its own definition.
#[derive(Debug, Clone)]
pub struct CteRef {
    name: String,
}

impl CteRef {
    pub fn col(&self, column: &str) -> Expr {
        Expr::qualified(&self.name, column)
    }
}

/// A named recursive CTE.
#[derive(Debug, Clone)]
pub struct With {
    name: String,
    body: Compound,
}

impl With {
    /// Build a recursive CTE. `make` receives a reference to the CTE itself
    /// so the recursive term can join against it.
    pub fn recursive<F>(name: &str, make: F) -> Self
    where
        F: FnOnce(&CteRef) -> Compound,
    {
        let cte = CteRef {
            name: name.to_string(),
        };
        let body = make(&cte);
        Self {
            name: cte.name,
            body,
        }
    }

    /// Columns produced by the CTE (taken from the anchor term).
    pub fn column_names(&self) -> Vec<String> {
        self.body.anchor.column_names()
    }

    /// `SELECT * FROM cte`, ready for ordering.
    pub fn queryset(self) -> CteQuery {
        CteQuery {
            with: self,
            order_by: Vec::new(),
        }
    }
}

/// The outer query reading a [`With`] back.
#[derive(Debug, Clone)]
pub struct CteQuery {
    with: With,
    order_by: Vec<String>,
}

impl CteQuery {
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(column.to_string());
        self
    }

    /// Render to SQL text plus bound parameter values.
    ///
    /// Fails if the two terms project a different number of columns or an
    /// identifier is not a plain name.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let body = &self.with.body;
        let columns = body.anchor.column_names();
        let step_width = body.recursive.column_names().len();
        if columns.len() != step_width {
            return Err(PedigreeError::Other(format!(
                "recursive CTE '{}': anchor selects {} columns but recursive term selects {}",
                self.with.name,
                columns.len(),
                step_width
            )));
        }

        let mut sql = String::from("WITH RECURSIVE ");
        let mut params = Vec::new();
        sql.push_str(ident(&self.with.name)?);
        sql.push('(');
        sql.push_str(&join_idents(&columns)?);
        sql.push_str(") AS (");
        body.anchor.render(&mut sql, &mut params)?;
        sql.push_str(" UNION ALL ");
        body.recursive.render(&mut sql, &mut params)?;
        sql.push_str(") SELECT ");
        sql.push_str(&join_idents(&columns)?);
        sql.push_str(" FROM ");
        sql.push_str(ident(&self.with.name)?);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&join_idents(&self.order_by)?);
        }
        Ok((sql, params))
    }
}

fn join_idents(names: &[String]) -> Result<String> {
    let checked = names
        .iter()
        .map(|n| ident(n))
        .collect::<Result<Vec<_>>>()?;
    Ok(checked.join(", "))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run a query and map each row to an [`AncestorRow`] by column name.
pub fn fetch_typed(store: &NodeStore, query: &CteQuery) -> Result<Vec<AncestorRow>> {
    let (sql, params) = query.to_sql()?;
    debug!(%sql, params = params.len(), "running builder query");
    let mut stmt = store.conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), row_to_ancestor)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Run a query and project each row into a [`Record`].
pub fn fetch_records(store: &NodeStore, query: &CteQuery) -> Result<Vec<Record>> {
    let (sql, params) = query.to_sql()?;
    debug!(%sql, params = params.len(), "running builder query (records)");
    let mut stmt = store.conn.prepare_cached(&sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let rows = stmt.query_and_then(params_from_iter(params.iter()), |row| {
        row_to_record(row, &columns)
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Ancestor chain
// ---------------------------------------------------------------------------

/// The ancestor traversal of `start_id`, expressed with the builder.
///
/// The recursive term stops expanding once a row deeper than `max_depth`
/// has been produced, so callers can tell truncation from a real root.
pub fn ancestors_query(start_id: i64, max_depth: u32) -> CteQuery {
    With::recursive("tree", |cte| {
        Select::table(&NODES)
            .filter_eq("id", start_id)
            .annotate("node", Expr::int(0))
            .union_all(
                Select::table(&NODES)
                    .join_cte(cte, "id", "parent_id")
                    .annotate("node", cte.col("node").plus(1))
                    .filter(cte.col("node").le(Expr::param(i64::from(max_depth)))),
            )
    })
    .queryset()
    .order_by("node")
}

/// Same traversal with an explicit `values(...)` projection, for record output.
pub fn ancestor_records_query(start_id: i64, max_depth: u32) -> CteQuery {
    const COLUMNS: &[&str] = &["id", "parent_id", "name"];
    With::recursive("tree", |cte| {
        Select::table(&NODES)
            .filter_eq("id", start_id)
            .values(COLUMNS)
            .annotate("node", Expr::int(0))
            .union_all(
                Select::table(&NODES)
                    .join_cte(cte, "id", "parent_id")
                    .values(COLUMNS)
                    .annotate("node", cte.col("node").plus(1))
                    .filter(cte.col("node").le(Expr::param(i64::from(max_depth)))),
            )
    })
    .queryset()
    .order_by("node")
}

/// Ancestor chain of `start_id` via the builder, as typed rows.
pub fn ancestors_builder(
    store: &NodeStore,
    start_id: i64,
    max_depth: u32,
) -> Result<Vec<AncestorRow>> {
    let rows = fetch_typed(store, &ancestors_query(start_id, max_depth))?;
    check_depth(start_id, rows.iter().map(|r| r.node), max_depth)?;
    Ok(rows)
}

/// Ancestor chain of `start_id` via the builder, as plain records.
pub fn ancestor_records(store: &NodeStore, start_id: i64, max_depth: u32) -> Result<Vec<Record>> {
    let records = fetch_records(store, &ancestor_records_query(start_id, max_depth))?;
    let depths = records
        .iter()
        .map(record_depth)
        .collect::<Result<Vec<_>>>()?;
    check_depth(start_id, depths.into_iter(), max_depth)?;
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
