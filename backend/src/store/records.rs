use crate::error::StoreResult;
use crate::store::schema::{
    infer_descriptors, insert_rows, quote_ident, select_cells, table_exists, user_columns,
    validate_columns, CREATED_AT, ROW_ID,
};
use chrono::NaiveDate;
use common::model::record::RecordSet;
use rusqlite::{params, Connection};

pub const WORKING_TABLE: &str = "daily_data";

/// The working table of one data source.
pub struct RecordStore<'a> {
    conn: &'a mut Connection,
}

impl<'a> RecordStore<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Current rows, or an empty set if nothing was ever saved.
    pub fn load(&self) -> StoreResult<RecordSet> {
        read_working_table(self.conn, None)
    }

    /// Rows created between `start` and `end`, both days inclusive.
    pub fn load_between(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<RecordSet> {
        read_working_table(self.conn, Some((start, end)))
    }

    /// Replaces the whole working table in one transaction. On any failure
    /// the previous table is left untouched.
    pub fn replace_all(&mut self, records: &RecordSet) -> StoreResult<usize> {
        validate_columns(&records.columns)?;
        let descriptors = infer_descriptors(&records.columns, &records.rows);

        let mut definitions = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(ROW_ID)
        )];
        definitions.extend(descriptors.iter().map(|d| d.definition()));
        definitions.push(format!(
            "{} TEXT DEFAULT (datetime('now', 'localtime'))",
            quote_ident(CREATED_AT)
        ));

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_ident(WORKING_TABLE)),
            [],
        )?;
        tx.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_ident(WORKING_TABLE),
                definitions.join(", ")
            ),
            [],
        )?;
        let written = insert_rows(&tx, WORKING_TABLE, &records.columns, &records.rows, None)?;
        tx.commit()?;

        log::info!(
            "Replaced {} with {} rows x {} columns",
            WORKING_TABLE,
            written,
            records.columns.len()
        );
        Ok(written)
    }
}

pub(crate) fn read_working_table(
    conn: &Connection,
    range: Option<(NaiveDate, NaiveDate)>,
) -> StoreResult<RecordSet> {
    if !table_exists(conn, WORKING_TABLE)? {
        return Ok(RecordSet::default());
    }
    let columns = user_columns(conn, WORKING_TABLE)?;
    if columns.is_empty() {
        return Ok(RecordSet::default());
    }
    let select = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let base = format!("SELECT {} FROM {}", select, quote_ident(WORKING_TABLE));
    let rows = match range {
        None => select_cells(
            conn,
            &format!("{} ORDER BY {}", base, quote_ident(ROW_ID)),
            columns.len(),
            [],
        )?,
        Some((start, end)) => select_cells(
            conn,
            &format!(
                "{} WHERE date({}) BETWEEN ?1 AND ?2 ORDER BY {}",
                base,
                quote_ident(CREATED_AT),
                quote_ident(ROW_ID)
            ),
            columns.len(),
            params![start.to_string(), end.to_string()],
        )?,
    };
    Ok(RecordSet::with_rows(columns, rows))
}
