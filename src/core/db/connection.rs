/// Connection Management Module
///
/// This module provides connection acquisition behind the `DataSource`
/// capability, the session state machine used by caller-managed sessions,
/// and explicit connection release.

use crate::config::DataSourceConfig;
use crate::core::{DaoError, Result};
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Represents the lifecycle of a caller-managed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection held, work may be pending
    Open,
    /// Last transaction was committed
    Committed,
    /// Last transaction was rolled back
    RolledBack,
    /// Connection released; every further call fails
    Closed,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Open
    }
}

/// The "acquire connection" capability consumed by the DAOs.
///
/// Implementations own data-source identity (paths, pools, credentials);
/// the DAOs only ever ask for a fresh connection.
pub trait DataSource {
    fn acquire(&self) -> Result<Connection>;
}

impl<D: DataSource + ?Sized> DataSource for &D {
    fn acquire(&self) -> Result<Connection> {
        (**self).acquire()
    }
}

impl<D: DataSource + ?Sized> DataSource for Arc<D> {
    fn acquire(&self) -> Result<Connection> {
        (**self).acquire()
    }
}

/// Adapts a closure into a [`DataSource`].
pub struct FnDataSource<F>(pub F);

impl<F> DataSource for FnDataSource<F>
where
    F: Fn() -> Result<Connection>,
{
    fn acquire(&self) -> Result<Connection> {
        (self.0)()
    }
}

/// Data source opening SQLite database files.
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    config: DataSourceConfig,
}

impl SqliteDataSource {
    /// Creates a data source from configuration
    pub fn new(config: DataSourceConfig) -> Self {
        SqliteDataSource { config }
    }

    /// Creates a data source for the database file at `path` with default settings
    pub fn open(path: impl Into<String>) -> Self {
        SqliteDataSource::new(DataSourceConfig::with_path(path))
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }
}

impl DataSource for SqliteDataSource {
    /// Opens a new connection and applies the configured pragmas.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Connectivity` if the file cannot be opened or a
    /// pragma cannot be applied.
    fn acquire(&self) -> Result<Connection> {
        let flags = if self.config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };

        let conn = Connection::open_with_flags(&self.config.path, flags)
            .map_err(|e| DaoError::connectivity(&format!("Failed to open {}", self.config.path), e))?;

        if let Some(ms) = self.config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))
                .map_err(|e| DaoError::connectivity("Failed to set busy timeout", e))?;
        }

        if let Some(foreign_keys) = self.config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", foreign_keys)
                .map_err(|e| DaoError::connectivity("Failed to set foreign_keys", e))?;
        }

        if let Some(mode) = &self.config.journal_mode {
            let applied: String = conn
                .pragma_update_and_check(None, "journal_mode", mode.as_str(), |row| row.get(0))
                .map_err(|e| DaoError::connectivity("Failed to set journal_mode", e))?;
            debug!("journal_mode is {}", applied);
        }

        debug!("Acquired connection to {}", self.config.path);
        Ok(conn)
    }
}

/// Releases a connection.
///
/// A transaction still open at this point is discarded by the driver.
pub fn release(connection: Connection) {
    if !connection.is_autocommit() {
        warn!("Releasing connection with an open transaction; it will be rolled back");
    }
    if let Err((_, e)) = connection.close() {
        warn!("Failed to close connection: {}", e);
    }
}
