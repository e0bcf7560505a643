/// Single-call DAO
///
/// Fully automatic connection and transaction lifecycle: each call acquires a
/// connection, executes, commits or rolls back, and releases the connection
/// on every exit path. Callers never see a connection or a transaction.

use crate::config::{Config, ZeroRowPolicy};
use crate::core::db::{
    commit, release, rollback, BindVariable, Cursor, DataSource, QueryExecutor, Row,
    SqliteDataSource, StatementType,
};
use crate::core::Result;
use crate::mapper::{Record, RowMapper};
use rusqlite::Connection;
use tracing::{debug, error, warn};

/// How the transaction of a successful mutation was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// An explicit COMMIT was issued
    Committed,
    /// Neither COMMIT nor ROLLBACK was issued before release
    Released,
}

/// Result of a single-call mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    pub affected_rows: usize,
    pub completion: Completion,
}

/// DAO that owns the whole connection lifecycle of every call.
#[derive(Debug, Clone)]
pub struct SingleCallDao<D> {
    data_source: D,
    zero_row_policy: ZeroRowPolicy,
}

impl SingleCallDao<SqliteDataSource> {
    /// Builds a DAO for the configured SQLite data source.
    pub fn from_config(config: &Config) -> Self {
        SingleCallDao::new(SqliteDataSource::new(config.datasource.clone()))
            .with_zero_row_policy(config.zero_row_policy())
    }
}

impl<D: DataSource> SingleCallDao<D> {
    pub fn new(data_source: D) -> Self {
        SingleCallDao {
            data_source,
            zero_row_policy: ZeroRowPolicy::default(),
        }
    }

    pub fn with_zero_row_policy(mut self, policy: ZeroRowPolicy) -> Self {
        self.zero_row_policy = policy;
        self
    }

    pub fn zero_row_policy(&self) -> ZeroRowPolicy {
        self.zero_row_policy
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    /// Runs a query on a fresh connection and returns every row.
    pub fn select_rows(&self, sql: &str, binds: &[BindVariable]) -> Result<Vec<Row>> {
        self.with_connection(|conn| QueryExecutor::new(conn).select_rows(sql, binds))
    }

    /// Runs a query and maps every row into a fresh `T`.
    pub fn select_records<T: Record>(&self, sql: &str, binds: &[BindVariable]) -> Result<Vec<T>> {
        self.with_cursor(sql, binds, |cursor| RowMapper::<T>::new().map_cursor(cursor))
    }

    /// Runs a query and hands the live cursor to `consume`.
    ///
    /// The cursor and its connection are released after `consume` returns, so
    /// everything needed from the rows must be extracted inside the closure.
    pub fn with_cursor<R, F>(&self, sql: &str, binds: &[BindVariable], consume: F) -> Result<R>
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<R>,
    {
        self.with_connection(|conn| {
            let mut cursor = QueryExecutor::new(conn).select_cursor(sql, binds)?;
            let result = consume(&mut cursor);
            drop(cursor);
            result
        })
    }

    pub fn insert(&self, sql: &str, binds: &[BindVariable]) -> Result<MutationOutcome> {
        self.mutate(sql, binds)
    }

    pub fn update(&self, sql: &str, binds: &[BindVariable]) -> Result<MutationOutcome> {
        self.mutate(sql, binds)
    }

    pub fn delete(&self, sql: &str, binds: &[BindVariable]) -> Result<MutationOutcome> {
        self.mutate(sql, binds)
    }

    /// Executes a mutation in its own transaction.
    ///
    /// A mutation that affected rows is committed. One that affected no rows
    /// is committed or simply released depending on the zero-row policy. On
    /// failure the transaction is rolled back before the connection is
    /// released and the error is returned.
    pub fn mutate(&self, sql: &str, binds: &[BindVariable]) -> Result<MutationOutcome> {
        let connection = self.data_source.acquire()?;
        let result = self.run_mutation(&connection, sql, binds);
        release(connection);
        result
    }

    fn run_mutation(
        &self,
        connection: &Connection,
        sql: &str,
        binds: &[BindVariable],
    ) -> Result<MutationOutcome> {
        let affected = match QueryExecutor::new(connection).execute_mutation(sql, binds) {
            Ok(affected) => affected,
            Err(err) => {
                error!("{:?} failed, rolling back: {}", StatementType::from_sql(sql), err);
                rollback_quietly(connection);
                return Err(err);
            }
        };

        if affected == 0 && self.zero_row_policy == ZeroRowPolicy::Release {
            debug!("Mutation affected no rows; releasing without commit");
            return Ok(MutationOutcome {
                affected_rows: 0,
                completion: Completion::Released,
            });
        }

        if let Err(err) = commit(connection) {
            error!("Commit failed, rolling back: {}", err);
            rollback_quietly(connection);
            return Err(err);
        }
        debug!("Committed mutation affecting {} rows", affected);
        Ok(MutationOutcome {
            affected_rows: affected,
            completion: Completion::Committed,
        })
    }

    fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let connection = self.data_source.acquire()?;
        let result = f(&connection);
        release(connection);
        result
    }
}

fn rollback_quietly(connection: &Connection) {
    if let Err(err) = rollback(connection) {
        warn!("Rollback failed: {}", err);
    }
}
