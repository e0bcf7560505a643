/// Bind Variable Module
///
/// Tagged positional parameters. Callers describe each value together with
/// its kind, and the executor applies them to the statement's placeholders
/// in sequence order without exposing driver-specific binding calls.

use crate::core::{DaoError, Result};
use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput};
use std::fmt;
use std::str::FromStr;

/// ISO date format used for dates on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The declared kind of a bind variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindKind {
    Integer,
    Text,
    FixedChar,
    Date,
}

impl fmt::Display for BindKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BindKind::Integer => "int",
            BindKind::Text => "text",
            BindKind::FixedChar => "char",
            BindKind::Date => "date",
        };
        f.write_str(tag)
    }
}

/// A single positional parameter value.
///
/// The position of a bind variable in its sequence is its placeholder
/// position: the first element is bound to the first `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum BindVariable {
    Integer(i64),
    Text(String),
    /// Fixed-width character data (`CHAR(n)` columns)
    FixedChar(String),
    Date(NaiveDate),
}

impl BindVariable {
    pub fn integer(value: i64) -> Self {
        BindVariable::Integer(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        BindVariable::Text(value.into())
    }

    pub fn fixed_char(value: impl Into<String>) -> Self {
        BindVariable::FixedChar(value.into())
    }

    pub fn date(value: NaiveDate) -> Self {
        BindVariable::Date(value)
    }

    /// Returns the kind tag of this variable.
    pub fn kind(&self) -> BindKind {
        match self {
            BindVariable::Integer(_) => BindKind::Integer,
            BindVariable::Text(_) => BindKind::Text,
            BindVariable::FixedChar(_) => BindKind::FixedChar,
            BindVariable::Date(_) => BindKind::Date,
        }
    }
}

impl ToSql for BindVariable {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            BindVariable::Integer(i) => ToSqlOutput::from(*i),
            BindVariable::Text(s) | BindVariable::FixedChar(s) => ToSqlOutput::from(s.as_str()),
            BindVariable::Date(d) => ToSqlOutput::from(d.format(DATE_FORMAT).to_string()),
        })
    }
}

impl fmt::Display for BindVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindVariable::Integer(i) => write!(f, "{}:{}", self.kind(), i),
            BindVariable::Text(s) | BindVariable::FixedChar(s) => write!(f, "{}:{}", self.kind(), s),
            BindVariable::Date(d) => write!(f, "{}:{}", self.kind(), d.format(DATE_FORMAT)),
        }
    }
}

/// Parses the textual form `kind:value`, e.g. `int:5` or `date:2024-01-31`.
impl FromStr for BindVariable {
    type Err = DaoError;

    fn from_str(s: &str) -> Result<Self> {
        let (tag, value) = s
            .split_once(':')
            .ok_or_else(|| DaoError::Query(format!("bind '{}' is not of the form kind:value", s)))?;

        match tag.trim().to_lowercase().as_str() {
            "int" | "integer" => value
                .trim()
                .parse::<i64>()
                .map(BindVariable::Integer)
                .map_err(|e| DaoError::Query(format!("invalid integer bind '{}': {}", value, e))),
            "text" | "string" => Ok(BindVariable::Text(value.to_string())),
            "char" => Ok(BindVariable::FixedChar(value.to_string())),
            "date" => NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
                .map(BindVariable::Date)
                .map_err(|e| DaoError::Query(format!("invalid date bind '{}': {}", value, e))),
            other => Err(DaoError::Query(format!("unknown bind kind '{}'", other))),
        }
    }
}

impl From<i64> for BindVariable {
    fn from(value: i64) -> Self {
        BindVariable::Integer(value)
    }
}

impl From<&str> for BindVariable {
    fn from(value: &str) -> Self {
        BindVariable::Text(value.to_string())
    }
}

impl From<String> for BindVariable {
    fn from(value: String) -> Self {
        BindVariable::Text(value)
    }
}

impl From<NaiveDate> for BindVariable {
    fn from(value: NaiveDate) -> Self {
        BindVariable::Date(value)
    }
}
