/// Query Execution Module
///
/// This module turns SQL text plus an ordered list of bind variables into
/// materialized rows, a live cursor, or an affected-row count. It owns the
/// per-call driver resources (prepared statements) but never the connection.

use crate::core::db::bind::BindVariable;
use crate::core::db::cursor::Cursor;
use crate::core::db::value::Row;
use crate::core::{DaoError, Result};
use rusqlite::{Connection, Statement};
use tracing::debug;

/// Query execution service that operates on a borrowed connection
pub struct QueryExecutor<'a> {
    connection: &'a Connection,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new QueryExecutor for the given connection
    pub fn new(connection: &'a Connection) -> Self {
        QueryExecutor { connection }
    }

    /// Executes a query and materializes every row.
    ///
    /// The prepared statement is released before this returns.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Query` for malformed SQL, a bind count that does not
    /// match the placeholder count, or a failure while fetching rows.
    pub fn select_rows(&self, sql: &str, binds: &[BindVariable]) -> Result<Vec<Row>> {
        let rows = self.select_cursor(sql, binds)?.collect_rows()?;
        debug!("Selected {} rows", rows.len());
        Ok(rows)
    }

    /// Prepares and binds a query, returning the unconsumed cursor.
    ///
    /// The caller owns the cursor and its statement; the statement is
    /// released when the cursor is closed or dropped.
    pub fn select_cursor(&self, sql: &str, binds: &[BindVariable]) -> Result<Cursor<'a>> {
        let statement = self.prepare_bound(sql, binds)?;
        Ok(Cursor::new(statement))
    }

    /// Executes an INSERT, UPDATE or DELETE inside an explicit transaction.
    ///
    /// If the connection is in auto-commit mode a transaction is started
    /// first. The transaction is left pending: committing or rolling back is
    /// up to the caller.
    ///
    /// # Returns
    ///
    /// The number of rows affected as reported by the driver.
    pub fn execute_mutation(&self, sql: &str, binds: &[BindVariable]) -> Result<usize> {
        let statement_type = StatementType::from_sql(sql);
        if statement_type == StatementType::Transaction {
            return Err(DaoError::Query(
                "Transaction control statements cannot be executed as mutations".to_string(),
            ));
        }

        if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN")
                .map_err(|e| DaoError::query("Failed to begin transaction", e))?;
            debug!("Auto-commit disabled for mutation");
        }

        let mut statement = self.prepare_bound(sql, binds)?;
        let affected = statement
            .raw_execute()
            .map_err(|e| DaoError::query("Mutation failed", e))?;
        // Only COMMIT/END/ROLLBACK in disguise can leave auto-commit mode here
        if self.connection.is_autocommit() {
            return Err(DaoError::Query(
                "Statement ended the pending transaction; use the DAO commit or rollback".to_string(),
            ));
        }
        debug!("{:?} affected {} rows", statement_type, affected);
        Ok(affected)
    }

    /// Prepares `sql` and binds `binds` to positions 1..=n in sequence order.
    fn prepare_bound(&self, sql: &str, binds: &[BindVariable]) -> Result<Statement<'a>> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|e| DaoError::query("Failed to prepare statement", e))?;

        let expected = statement.parameter_count();
        if expected != binds.len() {
            return Err(DaoError::Query(format!(
                "Statement has {} placeholders but {} bind variables were supplied",
                expected,
                binds.len()
            )));
        }

        for (idx, bind) in binds.iter().enumerate() {
            statement
                .raw_bind_parameter(idx + 1, bind)
                .map_err(|e| DaoError::query(&format!("Failed to bind parameter {}", idx + 1), e))?;
        }
        Ok(statement)
    }
}

/// Commits the open transaction, if any.
pub fn commit(connection: &Connection) -> Result<()> {
    if !connection.is_autocommit() {
        connection
            .execute_batch("COMMIT")
            .map_err(|e| DaoError::query("Commit failed", e))?;
    }
    Ok(())
}

/// Rolls back the open transaction, if any.
pub fn rollback(connection: &Connection) -> Result<()> {
    if !connection.is_autocommit() {
        connection
            .execute_batch("ROLLBACK")
            .map_err(|e| DaoError::query("Rollback failed", e))?;
    }
    Ok(())
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// CREATE, DROP or ALTER statement
    Ddl,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from the leading keyword of a SQL string
    ///
    /// Leading `--` and `/* */` comments are skipped.
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = skip_leading_comments(sql).to_uppercase();
        let keyword = sql_upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or("");

        match keyword {
            "SELECT" | "WITH" => StatementType::Select,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" | "DROP" | "ALTER" => StatementType::Ddl,
            "BEGIN" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
                StatementType::Transaction
            }
            _ => StatementType::Other,
        }
    }
}

fn skip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.find('\n').map(|i| &line[i + 1..]).unwrap_or("");
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.find("*/").map(|i| &block[i + 2..]).unwrap_or("");
        } else {
            return rest;
        }
        rest = rest.trim_start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::value::SqlValue;
    use rusqlite::Connection;

    fn setup_test_table(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE t (
                id INTEGER PRIMARY KEY,
                name VARCHAR(20),
                code CHAR(2),
                born DATE
            );
            INSERT INTO t VALUES (5, 'a', 'X1', '2001-02-03');
            INSERT INTO t VALUES (6, 'b', 'X2', NULL);
            INSERT INTO t VALUES (7, 'a', 'X3', NULL);
        ",
        )
        .unwrap();
    }

    #[test]
    fn test_binds_apply_in_sequence_order() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let executor = QueryExecutor::new(&conn);
        let rows = executor
            .select_rows(
                "SELECT * FROM t WHERE id=? AND name=?",
                &[BindVariable::integer(5), BindVariable::text("a")],
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], SqlValue::Integer(5));
        assert_eq!(rows[0]["name"], SqlValue::Text("a".to_string()));
        assert_eq!(rows[0]["code"], SqlValue::Text("X1".to_string()));
    }

    #[test]
    fn test_first_placeholder_receives_first_bind() {
        let conn = Connection::open_in_memory().unwrap();
        let executor = QueryExecutor::new(&conn);
        let rows = executor
            .select_rows(
                "SELECT ? AS first, ? AS second",
                &[BindVariable::integer(1), BindVariable::text("two")],
            )
            .unwrap();
        assert_eq!(rows[0]["first"], SqlValue::Integer(1));
        assert_eq!(rows[0]["second"], SqlValue::Text("two".to_string()));
    }

    #[test]
    fn test_empty_binds_without_placeholders() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let executor = QueryExecutor::new(&conn);
        let rows = executor.select_rows("SELECT id FROM t ORDER BY id", &[]).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![5, 6, 7]);
    }

    #[test]
    fn test_bind_count_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        match executor.select_rows("SELECT * FROM t WHERE id = ?", &[]) {
            Err(DaoError::Query(msg)) => assert!(msg.contains("1 placeholders but 0")),
            other => panic!("Expected Query error, got {:?}", other),
        }

        let too_many = executor.select_rows(
            "SELECT * FROM t",
            &[BindVariable::integer(1)],
        );
        assert!(matches!(too_many, Err(DaoError::Query(_))));
    }

    #[test]
    fn test_query_error_handling() {
        let conn = Connection::open_in_memory().unwrap();
        let executor = QueryExecutor::new(&conn);

        match executor.select_rows("SELECT * FROM nonexistent_table", &[]) {
            Err(DaoError::Query(msg)) => assert!(msg.contains("no such table")),
            other => panic!("Expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_date_and_fixed_char_binds() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        let born = chrono::NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();
        let rows = executor
            .select_rows(
                "SELECT id FROM t WHERE born = ? AND code = ?",
                &[BindVariable::date(born), BindVariable::fixed_char("X1")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], SqlValue::Integer(5));
    }

    #[test]
    fn test_select_cursor_is_lazy_and_owned_by_caller() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        let mut cursor = executor
            .select_cursor("SELECT name FROM t WHERE name = ?", &[BindVariable::text("a")])
            .unwrap();
        assert!(!cursor.is_consumed());
        assert_eq!(cursor.rows().count(), 2);
        cursor.close().unwrap();
    }

    #[test]
    fn test_mutation_disables_autocommit() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        assert!(conn.is_autocommit());
        let affected = executor
            .execute_mutation(
                "UPDATE t SET name = ? WHERE name = ?",
                &[BindVariable::text("z"), BindVariable::text("a")],
            )
            .unwrap();
        assert_eq!(affected, 2);
        assert!(!conn.is_autocommit());

        rollback(&conn).unwrap();
        assert!(conn.is_autocommit());
        let rows = executor.select_rows("SELECT id FROM t WHERE name = 'z'", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_mutation_commit() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        let affected = executor
            .execute_mutation("DELETE FROM t WHERE id = ?", &[BindVariable::integer(6)])
            .unwrap();
        assert_eq!(affected, 1);
        commit(&conn).unwrap();
        assert!(conn.is_autocommit());
        assert_eq!(executor.select_rows("SELECT id FROM t", &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_mutation_rejects_transaction_control() {
        let conn = Connection::open_in_memory().unwrap();
        let executor = QueryExecutor::new(&conn);
        assert!(matches!(
            executor.execute_mutation("COMMIT", &[]),
            Err(DaoError::Query(_))
        ));
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_statement_type_classification() {
        assert_eq!(StatementType::from_sql("SELECT * FROM users"), StatementType::Select);
        assert_eq!(StatementType::from_sql("  with x as (select 1) select * from x"), StatementType::Select);
        assert_eq!(StatementType::from_sql("INSERT INTO users VALUES (1, 'test')"), StatementType::Insert);
        assert_eq!(StatementType::from_sql("UPDATE users SET name = 'new'"), StatementType::Update);
        assert_eq!(StatementType::from_sql("DELETE FROM users WHERE id = 1"), StatementType::Delete);
        assert_eq!(StatementType::from_sql("CREATE TABLE test (id INTEGER)"), StatementType::Ddl);
        assert_eq!(StatementType::from_sql("BEGIN"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("commit;"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("ROLLBACK TRANSACTION"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("PRAGMA foreign_keys = ON"), StatementType::Other);
    }

    #[test]
    fn test_statement_type_skips_leading_comments() {
        assert_eq!(StatementType::from_sql("/* x */ COMMIT"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("-- c\nEND"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql(" -- a\n /* b */\n rollback"), StatementType::Transaction);
        assert_eq!(StatementType::from_sql("/* note */ DELETE FROM t"), StatementType::Delete);
        assert_eq!(StatementType::from_sql("-- only a comment"), StatementType::Other);
        assert_eq!(StatementType::from_sql("/* unterminated COMMIT"), StatementType::Other);
    }

    #[test]
    fn test_commented_commit_does_not_end_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);
        let executor = QueryExecutor::new(&conn);

        executor
            .execute_mutation("DELETE FROM t WHERE id = ?", &[BindVariable::integer(6)])
            .unwrap();
        for sql in ["/* x */ COMMIT", "-- c\nEND"] {
            assert!(matches!(executor.execute_mutation(sql, &[]), Err(DaoError::Query(_))));
            assert!(!conn.is_autocommit());
        }

        rollback(&conn).unwrap();
        assert_eq!(executor.select_rows("SELECT id FROM t", &[]).unwrap().len(), 3);
    }
}
