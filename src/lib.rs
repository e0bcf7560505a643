//! daokit: a small relational data access layer over SQLite.
//!
//! Statements are plain SQL text with positional `?` placeholders and an
//! ordered list of [`BindVariable`]s. [`SingleCallDao`] runs every call in its
//! own connection and transaction; [`MultiCallDao`] is a caller-managed
//! session that spans several calls. [`RowMapper`] copies result rows into
//! records that register a [`FieldTable`].

// Core infrastructure modules
pub mod config;
pub mod core;

// Access patterns and helpers
pub mod dao;
pub mod mapper;
pub mod resources;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{BindVariable, Cursor, DataSource, Row, SqlValue, SqliteDataSource};
pub use crate::core::{DaoError, Result};
pub use crate::dao::{Completion, MultiCallDao, MutationOutcome, SingleCallDao};
pub use crate::mapper::{FieldTable, Record, RowMapper};
