/// Daokit Error Module
///
/// This module defines the error taxonomy for the data access layer.
/// Every failure coming out of the driver is classified into one of the
/// three core categories (connectivity, query, mapping) with a short
/// context string describing the operation that failed.
use thiserror::Error;

/// Error type for all data access operations.
///
/// - `Connectivity`: a connection could not be acquired or is no longer usable
/// - `Query`: the driver rejected or failed to execute a statement
/// - `Mapping`: a result column could not be copied into a record field
/// - `Config` / `Resource` / `Io`: ambient failures around configuration and SQL files
#[derive(Error, Debug)]
pub enum DaoError {
    /// Cannot acquire or maintain a connection. Never retried internally.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Malformed SQL, bind-count mismatch, or execution failure reported by the driver
    #[error("Query error: {0}")]
    Query(String),

    /// A cursor column could not be matched to a record field
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQL resource lookup errors
    #[error("Resource error: {0}")]
    Resource(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaoError {
    /// Wraps a driver error raised while executing `context`.
    pub fn query(context: &str, err: rusqlite::Error) -> Self {
        DaoError::Query(format!("{}: {}", context, err))
    }

    /// Wraps a driver error raised while acquiring or configuring a connection.
    pub fn connectivity(context: &str, err: rusqlite::Error) -> Self {
        DaoError::Connectivity(format!("{}: {}", context, err))
    }

    /// Returns true for errors that leave the connection unusable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, DaoError::Connectivity(_))
    }
}

/// Type alias for Result to use DaoError as the error type.
pub type Result<T> = std::result::Result<T, DaoError>;
