/// Value Module
///
/// Generic result representation: dynamically typed scalars, rows keyed by
/// column name, and the column metadata a cursor reports.

use crate::core::db::bind::DATE_FORMAT;
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// A single column value read from the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Converts a raw driver value, taking the column's declared type into account.
    ///
    /// Text stored in a DATE column becomes a `Date` when it is an ISO date;
    /// anything else is kept as stored. Text that is not valid UTF-8 is kept
    /// byte for byte as a `Blob`.
    pub fn from_value_ref(value: ValueRef<'_>, sql_type: Option<&SqlType>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => {
                let text = match String::from_utf8(t.to_vec()) {
                    Ok(text) => text,
                    Err(e) => return SqlValue::Blob(e.into_bytes()),
                };
                if sql_type == Some(&SqlType::Date) {
                    if let Ok(date) = NaiveDate::parse_from_str(&text, DATE_FORMAT) {
                        return SqlValue::Date(date);
                    }
                }
                SqlValue::Text(text)
            }
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Integer(i) => serializer.serialize_i64(*i),
            SqlValue::Real(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Date(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            SqlValue::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

/// A materialized result row keyed by the driver-reported column name.
pub type Row = HashMap<String, SqlValue>;

/// SQL type of a result column as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// Variable-length character data
    Varchar,
    /// Fixed-length character data
    Char,
    Integer,
    Date,
    /// Any other declared type, kept by name
    Other(String),
}

impl SqlType {
    /// Classifies a declared column type such as `VARCHAR(40)` or `INTEGER`.
    pub fn from_decl(decl: &str) -> Self {
        let upper = decl.trim().to_uppercase();
        let base = match upper.find('(') {
            Some(idx) => upper[..idx].trim_end(),
            None => upper.as_str(),
        };

        match base {
            "VARCHAR" | "TEXT" | "CLOB" | "NVARCHAR" | "STRING" | "VARYING CHARACTER"
            | "CHARACTER VARYING" => SqlType::Varchar,
            "CHAR" | "CHARACTER" | "NCHAR" | "NATIVE CHARACTER" => SqlType::Char,
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "INT2"
            | "INT8" => SqlType::Integer,
            "DATE" => SqlType::Date,
            _ => SqlType::Other(base.to_string()),
        }
    }

    /// Classifies an untyped expression column from the value it produced.
    pub fn from_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(_) => Some(SqlType::Integer),
            SqlValue::Text(_) => Some(SqlType::Varchar),
            SqlValue::Date(_) => Some(SqlType::Date),
            SqlValue::Real(_) => Some(SqlType::Other("REAL".to_string())),
            SqlValue::Blob(_) => Some(SqlType::Other("BLOB".to_string())),
            SqlValue::Null => None,
        }
    }

    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Varchar | SqlType::Char)
    }
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name, case as returned by the driver
    pub name: String,
    /// Declared type, absent for expression columns
    pub decl_type: Option<String>,
    /// Classified type, absent when no declared type is available
    pub sql_type: Option<SqlType>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, decl_type: Option<&str>) -> Self {
        ColumnMeta {
            name: name.into(),
            decl_type: decl_type.map(String::from),
            sql_type: decl_type.map(SqlType::from_decl),
        }
    }
}
