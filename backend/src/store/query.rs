use crate::error::{StoreError, StoreResult};
use crate::store::schema::value_to_cell;
use common::model::record::RecordSet;
use regex::Regex;
use rusqlite::Connection;

/// Leading keyword of a statement, after any comments.
fn leading_keyword(sql: &str) -> StoreResult<Option<String>> {
    let re = Regex::new(r"(?s)^(?:\s+|--[^\n]*(?:\n|$)|/\*.*?\*/)*([A-Za-z]+)")
        .map_err(|e| StoreError::InvalidRequest(format!("regex error: {}", e)))?;
    Ok(re
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase()))
}

/// Ad-hoc query console. Only `SELECT` and `WITH` statements that SQLite
/// also reports as read-only are run. `ATTACH`, `PRAGMA`, transaction
/// control and every write are denied before anything executes.
pub fn run_query(conn: &Connection, sql: &str) -> StoreResult<RecordSet> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(StoreError::InvalidRequest("query must not be empty".into()));
    }
    if !matches!(leading_keyword(sql)?.as_deref(), Some("SELECT" | "WITH")) {
        return Err(StoreError::Denied(
            "only SELECT queries may be run from the query console".into(),
        ));
    }
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::InvalidRequest(format!("cannot prepare query: {}", e)))?;
    if !stmt.readonly() {
        return Err(StoreError::Denied(
            "only read-only statements may be run from the query console".into(),
        ));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(value_to_cell(row.get_ref(idx)?)?);
        }
        out.push(cells);
    }
    Ok(RecordSet::with_rows(columns, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreHandle;
    use common::model::record::CellValue;

    fn seeded() -> StoreHandle {
        let mut handle = StoreHandle::open_in_memory("test1").unwrap();
        handle
            .records()
            .replace_all(&RecordSet::with_rows(
                vec!["name".into(), "qty".into()],
                vec![vec!["a".into(), 2i64.into()], vec!["b".into(), 3i64.into()]],
            ))
            .unwrap();
        handle
    }

    #[test]
    fn select_returns_named_columns() {
        let handle = seeded();
        let result = run_query(
            handle.connection(),
            "SELECT name, qty * 2 AS doubled FROM daily_data ORDER BY name",
        )
        .unwrap();
        assert_eq!(result.columns, vec!["name", "doubled"]);
        assert_eq!(result.value(1, "doubled"), Some(&CellValue::Integer(6)));
    }

    #[test]
    fn writes_are_denied() {
        let mut handle = seeded();
        let err = run_query(handle.connection(), "DELETE FROM daily_data").unwrap_err();
        assert!(matches!(err, StoreError::Denied(_)));
        assert_eq!(handle.records().load().unwrap().len(), 2);
    }

    #[test]
    fn only_select_statements_run() {
        let handle = seeded();
        for sql in [
            "ATTACH DATABASE ':memory:' AS other",
            "BEGIN",
            "PRAGMA journal_mode",
            "WITH gone AS (SELECT 1) DELETE FROM daily_data",
            "VACUUM",
        ] {
            assert!(
                matches!(run_query(handle.connection(), sql), Err(StoreError::Denied(_))),
                "{} was not denied",
                sql
            );
        }

        let commented = run_query(
            handle.connection(),
            "-- totals\n/* per item */ with t AS (SELECT qty FROM daily_data) SELECT SUM(qty) AS total FROM t",
        )
        .unwrap();
        assert_eq!(commented.value(0, "total"), Some(&CellValue::Integer(5)));
    }

    #[test]
    fn malformed_sql_is_invalid() {
        let handle = seeded();
        assert!(matches!(
            run_query(handle.connection(), "SELECT FROM nowhere WHERE"),
            Err(StoreError::InvalidRequest(_))
        ));
        assert!(matches!(
            run_query(handle.connection(), "   "),
            Err(StoreError::InvalidRequest(_))
        ));
    }
}
