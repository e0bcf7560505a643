/// Core Module for Daokit
///
/// This module contains the fundamental components of the data access layer:
/// the error taxonomy and the database primitives (bind variables, rows,
/// cursors, the query executor and connection acquisition).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DaoError, Result};
