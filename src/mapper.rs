/// Row Mapper Module
///
/// Populates caller-defined records from a cursor without hand-written
/// per-entity mapping code. Each record type registers a field table that
/// maps a column name to a setter and the kind of value the setter accepts;
/// columns are matched by upper-cased name and dispatched by the column's
/// driver-reported SQL type.

use crate::core::db::{ColumnMeta, Cursor, SqlType, SqlValue};
use crate::core::{DaoError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// The value kind a field setter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Date,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => f.write_str("text"),
            FieldKind::Integer => f.write_str("integer"),
            FieldKind::Date => f.write_str("date"),
        }
    }
}

/// A typed setter for one field of `T`.
pub enum FieldSetter<T> {
    Text(fn(&mut T, String)),
    Integer(fn(&mut T, i64)),
    Date(fn(&mut T, NaiveDate)),
}

impl<T> FieldSetter<T> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldSetter::Text(_) => FieldKind::Text,
            FieldSetter::Integer(_) => FieldKind::Integer,
            FieldSetter::Date(_) => FieldKind::Date,
        }
    }
}

/// Column-name to setter table for a record type.
pub struct FieldTable<T> {
    fields: HashMap<String, FieldSetter<T>>,
}

impl<T> FieldTable<T> {
    pub fn new() -> Self {
        FieldTable {
            fields: HashMap::new(),
        }
    }

    /// Registers a setter for a character column.
    pub fn text(self, name: &str, setter: fn(&mut T, String)) -> Self {
        self.with(name, FieldSetter::Text(setter))
    }

    /// Registers a setter for an integer column.
    pub fn integer(self, name: &str, setter: fn(&mut T, i64)) -> Self {
        self.with(name, FieldSetter::Integer(setter))
    }

    /// Registers a setter for a date column.
    pub fn date(self, name: &str, setter: fn(&mut T, NaiveDate)) -> Self {
        self.with(name, FieldSetter::Date(setter))
    }

    fn with(mut self, name: &str, setter: FieldSetter<T>) -> Self {
        self.fields.insert(name.to_uppercase(), setter);
        self
    }

    /// Looks up the setter for a column, ignoring case.
    pub fn lookup(&self, column: &str) -> Option<&FieldSetter<T>> {
        self.fields.get(&column.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        FieldTable::new()
    }
}

/// A value object that can be populated from a result row.
pub trait Record: Default {
    fn field_table() -> FieldTable<Self>;
}

/// Copies cursor rows into records of type `T`.
pub struct RowMapper<T> {
    table: FieldTable<T>,
}

impl<T: Record> RowMapper<T> {
    pub fn new() -> Self {
        RowMapper {
            table: T::field_table(),
        }
    }

    /// Maps every remaining row of `cursor` into a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Mapping` on the first column without a matching
    /// field or with a type the field cannot accept.
    pub fn map_cursor(&self, cursor: &mut Cursor<'_>) -> Result<Vec<T>> {
        let mut rows = cursor.rows();
        let columns = rows.columns();
        let mut records = Vec::new();
        while let Some(values) = rows.next_values() {
            let mut record = T::default();
            self.populate(&mut record, columns, &values?)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Populates `target` from the first row of `cursor`.
    ///
    /// Returns `false` when the cursor has no rows; `target` is untouched.
    pub fn map_into(&self, cursor: &mut Cursor<'_>, target: &mut T) -> Result<bool> {
        let mut rows = cursor.rows();
        let columns = rows.columns();
        match rows.next_values() {
            Some(values) => {
                self.populate(target, columns, &values?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T> RowMapper<T> {
    /// Mapper with an explicit field table.
    pub fn with_table(table: FieldTable<T>) -> Self {
        RowMapper { table }
    }

    /// Copies each column value into the matching field of `record`.
    ///
    /// `values` are in the same order as `columns`, so repeated column names
    /// each deliver their own value. NULL values leave the field as it is. On
    /// error, fields set before the failing column keep their new values.
    pub fn populate(&self, record: &mut T, columns: &[ColumnMeta], values: &[SqlValue]) -> Result<()> {
        for (idx, column) in columns.iter().enumerate() {
            let value = values.get(idx).unwrap_or(&SqlValue::Null);
            let setter = self.table.lookup(&column.name).ok_or_else(|| {
                DaoError::Mapping(format!("No field registered for column {}", column.name))
            })?;

            let sql_type = match column.sql_type.clone().or_else(|| SqlType::from_value(value)) {
                Some(sql_type) => sql_type,
                // Untyped NULL: nothing to dispatch on and nothing to set
                None => continue,
            };
            let expected = match &sql_type {
                t if t.is_character() => FieldKind::Text,
                SqlType::Integer => FieldKind::Integer,
                SqlType::Date => FieldKind::Date,
                other => {
                    return Err(DaoError::Mapping(format!(
                        "Column {} has unsupported type {:?}",
                        column.name, other
                    )))
                }
            };
            if setter.kind() != expected {
                return Err(DaoError::Mapping(format!(
                    "Column {} is {:?} but its field expects {}",
                    column.name,
                    sql_type,
                    setter.kind()
                )));
            }

            match (setter, value) {
                (_, SqlValue::Null) => {}
                (FieldSetter::Text(set), SqlValue::Text(s)) => (*set)(record, s.clone()),
                (FieldSetter::Integer(set), SqlValue::Integer(i)) => (*set)(record, *i),
                (FieldSetter::Date(set), SqlValue::Date(d)) => (*set)(record, *d),
                (setter, value) => {
                    return Err(DaoError::Mapping(format!(
                        "Column {} holds {:?}, which cannot be stored as {}",
                        column.name,
                        value,
                        setter.kind()
                    )))
                }
            }
        }
        Ok(())
    }
}

impl<T: Record> Default for RowMapper<T> {
    fn default() -> Self {
        RowMapper::new()
    }
}
