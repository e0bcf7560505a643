/// Multi-call DAO
///
/// A caller-managed session: one connection and one transaction shared by
/// any number of calls. Nothing is committed until `commit` is called, and
/// the connection is held until `close`.

use crate::core::db::{
    commit, release, rollback, BindVariable, Cursor, DataSource, QueryExecutor, Row, SessionState,
};
use crate::core::{DaoError, Result};
use crate::mapper::{Record, RowMapper};
use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

/// Session object over a single connection.
///
/// Every operation takes `&mut self`: a session has one owner and calls are
/// serialized by the borrow checker. A cursor returned by
/// [`MultiCallDao::select_cursor`] borrows the session, so it must be dropped
/// or closed before the next call.
#[derive(Debug)]
pub struct MultiCallDao {
    connection: Option<Connection>,
    state: SessionState,
    session_id: Uuid,
}

impl MultiCallDao {
    /// Acquires the session connection.
    pub fn open<D: DataSource>(data_source: &D) -> Result<Self> {
        let connection = data_source.acquire()?;
        let session_id = Uuid::new_v4();
        debug!(session = %session_id, "Session opened");
        Ok(MultiCallDao {
            connection: Some(connection),
            state: SessionState::Open,
            session_id,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether a transaction is pending on the session connection.
    pub fn in_transaction(&self) -> bool {
        self.connection
            .as_ref()
            .map(|conn| !conn.is_autocommit())
            .unwrap_or(false)
    }

    pub fn select_rows(&mut self, sql: &str, binds: &[BindVariable]) -> Result<Vec<Row>> {
        QueryExecutor::new(self.connection()?).select_rows(sql, binds)
    }

    pub fn select_records<T: Record>(&mut self, sql: &str, binds: &[BindVariable]) -> Result<Vec<T>> {
        let mut cursor = self.select_cursor(sql, binds)?;
        let records = RowMapper::<T>::new().map_cursor(&mut cursor)?;
        Ok(records)
    }

    /// Returns a live cursor on the session connection.
    pub fn select_cursor(&mut self, sql: &str, binds: &[BindVariable]) -> Result<Cursor<'_>> {
        QueryExecutor::new(self.connection()?).select_cursor(sql, binds)
    }

    pub fn insert(&mut self, sql: &str, binds: &[BindVariable]) -> Result<usize> {
        self.mutate(sql, binds)
    }

    pub fn update(&mut self, sql: &str, binds: &[BindVariable]) -> Result<usize> {
        self.mutate(sql, binds)
    }

    pub fn delete(&mut self, sql: &str, binds: &[BindVariable]) -> Result<usize> {
        self.mutate(sql, binds)
    }

    /// Executes a mutation in the session transaction without committing.
    ///
    /// A mutation after `commit` or `rollback` starts a new transaction.
    pub fn mutate(&mut self, sql: &str, binds: &[BindVariable]) -> Result<usize> {
        self.connection()?;
        self.state = SessionState::Open;
        let affected = QueryExecutor::new(self.connection()?).execute_mutation(sql, binds)?;
        debug!(session = %self.session_id, affected, "Mutation pending");
        Ok(affected)
    }

    /// Commits every mutation issued since the last commit or rollback.
    pub fn commit(&mut self) -> Result<()> {
        commit(self.connection()?)?;
        self.state = SessionState::Committed;
        debug!(session = %self.session_id, "Committed");
        Ok(())
    }

    /// Discards every mutation issued since the last commit or rollback.
    pub fn rollback(&mut self) -> Result<()> {
        rollback(self.connection()?)?;
        self.state = SessionState::RolledBack;
        debug!(session = %self.session_id, "Rolled back");
        Ok(())
    }

    /// Releases the session connection.
    ///
    /// Work that was neither committed nor rolled back is rolled back.
    pub fn close(&mut self) -> Result<()> {
        self.connection()?;
        self.state = SessionState::Closed;
        if let Some(connection) = self.connection.take() {
            self.finish(connection);
        }
        debug!(session = %self.session_id, "Session closed");
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        match (&self.connection, self.state) {
            (Some(connection), state) if state != SessionState::Closed => Ok(connection),
            _ => Err(DaoError::Connectivity(format!(
                "Session {} is closed",
                self.session_id
            ))),
        }
    }

    fn finish(&self, connection: Connection) {
        if !connection.is_autocommit() {
            warn!(session = %self.session_id, "Uncommitted work discarded on release");
            if let Err(err) = rollback(&connection) {
                warn!(session = %self.session_id, "Rollback failed: {}", err);
            }
        }
        release(connection);
    }
}

impl Drop for MultiCallDao {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            warn!(session = %self.session_id, "Session dropped without close");
            self.finish(connection);
        }
    }
}
