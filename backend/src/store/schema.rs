//! Column descriptors and the small amount of SQL text built from them.
//!
//! Identifiers are always quoted through `quote_ident`; values always go
//! through bound parameters.

use crate::error::{StoreError, StoreResult};
use common::model::record::CellValue;
use regex::Regex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashSet;

pub(crate) const ROW_ID: &str = "id";
pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const SNAPSHOT_TAKEN_AT: &str = "snapshot_taken_at";

const RESERVED: [&str; 3] = [ROW_ID, CREATED_AT, SNAPSHOT_TAKEN_AT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnType {
    Integer,
    Real,
    /// Integers and reals side by side. Declared without affinity so neither
    /// kind gets converted on insert.
    Mixed,
    Text,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Mixed => "BLOB",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnType,
}

impl ColumnDescriptor {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnType::Text,
        }
    }

    pub fn definition(&self) -> String {
        format!("{} {}", quote_ident(&self.name), self.kind.sql())
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validate user-supplied column names: non-empty, unique (SQLite compares
/// identifiers case-insensitively), not reserved, and made of letters,
/// digits, spaces, `-`, `_` or `.`.
pub(crate) fn validate_columns(columns: &[String]) -> StoreResult<()> {
    let name_re = Regex::new(r"^[\p{L}\p{M}\p{N} \-_.]+$")
        .map_err(|e| StoreError::Shape(format!("regex error: {}", e)))?;
    let mut seen = HashSet::new();
    for column in columns {
        if column.trim().is_empty() {
            return Err(StoreError::Shape("column names must not be empty".into()));
        }
        if !name_re.is_match(column) {
            return Err(StoreError::Shape(format!(
                "column '{}' may only contain letters, digits, spaces, '-', '_' or '.'",
                column
            )));
        }
        let folded = column.to_lowercase();
        if RESERVED.contains(&folded.as_str()) {
            return Err(StoreError::Shape(format!("column name '{}' is reserved", column)));
        }
        if !seen.insert(folded) {
            return Err(StoreError::Shape(format!("duplicate column '{}'", column)));
        }
    }
    Ok(())
}

/// Picks the narrowest affinity that holds every non-null value of each column.
pub(crate) fn infer_descriptors(
    columns: &[String],
    rows: &[Vec<CellValue>],
) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut kind = None;
            for cell in rows.iter().filter_map(|row| row.get(idx)) {
                kind = match (kind, cell) {
                    (_, CellValue::Null) => kind,
                    (_, CellValue::Text(_)) | (Some(ColumnType::Text), _) => Some(ColumnType::Text),
                    (None | Some(ColumnType::Integer), CellValue::Integer(_)) => {
                        Some(ColumnType::Integer)
                    }
                    (None | Some(ColumnType::Real), CellValue::Real(_)) => Some(ColumnType::Real),
                    (_, CellValue::Integer(_) | CellValue::Real(_)) => Some(ColumnType::Mixed),
                };
            }
            ColumnDescriptor {
                name: name.clone(),
                kind: kind.unwrap_or(ColumnType::Text),
            }
        })
        .collect()
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column names of `table` in declaration order; empty when it does not exist.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Like `table_columns`, minus the bookkeeping columns.
pub(crate) fn user_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    Ok(table_columns(conn, table)?
        .into_iter()
        .filter(|c| !RESERVED.contains(&c.to_lowercase().as_str()))
        .collect())
}

pub(crate) fn cell_to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Integer(v) => Value::Integer(*v),
        CellValue::Real(v) => Value::Real(*v),
        CellValue::Text(v) => Value::Text(v.clone()),
    }
}

pub(crate) fn value_to_cell(value: ValueRef<'_>) -> StoreResult<CellValue> {
    Ok(match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Integer(v),
        ValueRef::Real(v) => CellValue::Real(v),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => {
            return Err(StoreError::Shape("binary cells are not supported".into()));
        }
    })
}

/// Inserts `rows` into `table`, optionally tagging every row with one extra
/// column value. Row widths are checked as rows are written, so callers must
/// hold a transaction for the whole call.
pub(crate) fn insert_rows(
    conn: &Connection,
    table: &str,
    columns: &[String],
    rows: &[Vec<CellValue>],
    tag: Option<(&str, &str)>,
) -> StoreResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    if let Some((tag_column, _)) = tag {
        names.push(quote_ident(tag_column));
    }
    if names.is_empty() {
        return Err(StoreError::Shape("rows need at least one column".into()));
    }
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(StoreError::Shape(format!(
                "row {} has {} cells, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            )));
        }
        let tag_value = tag.map(|(_, v)| Value::Text(v.to_string()));
        stmt.execute(params_from_iter(row.iter().map(cell_to_value).chain(tag_value)))?;
    }
    Ok(rows.len())
}

/// Runs `sql` and collects the given columns of every row.
pub(crate) fn select_cells<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    width: usize,
    params: P,
) -> StoreResult<Vec<Vec<CellValue>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(value_to_cell(row.get_ref(idx)?)?);
        }
        out.push(cells);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn column_validation() {
        let ok: Vec<String> = vec!["col1".into(), "Unit price".into(), "año".into()];
        assert!(validate_columns(&ok).is_ok());

        for bad in [vec![""], vec!["a;drop"], vec!["ID"], vec!["x", "X"]] {
            let cols: Vec<String> = bad.into_iter().map(String::from).collect();
            assert!(matches!(validate_columns(&cols), Err(StoreError::Shape(_))));
        }
    }

    #[test]
    fn affinity_inference() {
        let columns: Vec<String> = vec![
            "i".into(),
            "r".into(),
            "m".into(),
            "t".into(),
            "n".into(),
        ];
        let rows = vec![
            vec![1i64.into(), 0.5.into(), 1i64.into(), 1i64.into(), CellValue::Null],
            vec![2i64.into(), 2.5.into(), 2.5.into(), "x".into(), CellValue::Null],
        ];
        let kinds: Vec<ColumnType> = infer_descriptors(&columns, &rows)
            .into_iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ColumnType::Integer,
                ColumnType::Real,
                ColumnType::Mixed,
                ColumnType::Text,
                ColumnType::Text
            ]
        );
    }
}
