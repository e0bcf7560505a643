/// Cursor Module
///
/// A forward-only, single-pass view over a live, already bound statement.
/// The cursor borrows the connection it was prepared on, so the connection
/// cannot be released while the cursor is alive.

use crate::core::db::value::{ColumnMeta, Row, SqlValue};
use crate::core::{DaoError, Result};
use rusqlite::Statement;
use tracing::debug;

/// Live cursor over the result of a bound statement.
///
/// Rows are produced through [`Cursor::rows`]. The cursor executes its
/// statement once; asking for rows again after that yields nothing.
#[derive(Debug)]
pub struct Cursor<'conn> {
    statement: Statement<'conn>,
    columns: Vec<ColumnMeta>,
    consumed: bool,
}

impl<'conn> Cursor<'conn> {
    /// Wraps a statement whose parameters have already been bound.
    pub(crate) fn new(statement: Statement<'conn>) -> Self {
        let columns = statement
            .columns()
            .iter()
            .map(|column| ColumnMeta::new(column.name(), column.decl_type()))
            .collect();

        Cursor {
            statement,
            columns,
            consumed: false,
        }
    }

    /// Column metadata in result order.
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Whether the rows of this cursor have already been requested.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Executes the statement and iterates over its rows.
    pub fn rows(&mut self) -> CursorRows<'_> {
        if self.consumed {
            return CursorRows {
                rows: None,
                columns: &self.columns,
            };
        }
        self.consumed = true;
        CursorRows {
            rows: Some(self.statement.raw_query()),
            columns: &self.columns,
        }
    }

    /// Drains the cursor into materialized rows and releases it.
    pub fn collect_rows(mut self) -> Result<Vec<Row>> {
        let rows = self.rows().collect::<Result<Vec<_>>>();
        rows
    }

    /// Releases the underlying statement.
    pub fn close(self) -> Result<()> {
        debug!("Closing cursor over {} columns", self.columns.len());
        self.statement
            .finalize()
            .map_err(|e| DaoError::query("Failed to close cursor", e))
    }
}

/// Iterator over the rows of a [`Cursor`].
pub struct CursorRows<'c> {
    rows: Option<rusqlite::Rows<'c>>,
    columns: &'c [ColumnMeta],
}

impl<'c> CursorRows<'c> {
    /// Column metadata of the rows being produced.
    pub fn columns(&self) -> &'c [ColumnMeta] {
        self.columns
    }

    /// Fetches the next row as values in column order.
    ///
    /// Unlike a [`Row`], this keeps every column when names repeat.
    pub fn next_values(&mut self) -> Option<Result<Vec<SqlValue>>> {
        let rows = self.rows.as_mut()?;
        let next = match rows.next() {
            Ok(Some(row)) => Some(read_values(row, self.columns)),
            Ok(None) => None,
            Err(e) => Some(Err(DaoError::query("Failed to fetch row", e))),
        };

        // Exhausted or failed cursors stay exhausted
        if !matches!(next, Some(Ok(_))) {
            self.rows = None;
        }
        next
    }
}

impl<'c> Iterator for CursorRows<'c> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns;
        self.next_values().map(|values| {
            values.map(|values| {
                columns
                    .iter()
                    .map(|column| column.name.clone())
                    .zip(values)
                    .collect()
            })
        })
    }
}

fn read_values(row: &rusqlite::Row<'_>, columns: &[ColumnMeta]) -> Result<Vec<SqlValue>> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            row.get_ref(idx)
                .map(|value| SqlValue::from_value_ref(value, column.sql_type.as_ref()))
                .map_err(|e| DaoError::query("Failed to read column", e))
        })
        .collect()
}
