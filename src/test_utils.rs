/// # Test Utilities Module
///
/// File-backed database fixtures for DAO tests. Every fixture lives in its
/// own temporary file so that separate connections see the same data and
/// tests stay isolated from each other.

use crate::core::db::{DataSource, SqliteDataSource};
use crate::core::Result;
use tempfile::NamedTempFile;

/// Isolated, file-backed database fixture
pub struct DatabaseFixture {
    source: SqliteDataSource,
    // Deleted when the fixture is dropped
    _file: NamedTempFile,
}

impl DatabaseFixture {
    /// Create an empty database
    pub fn new() -> Result<Self> {
        let file = NamedTempFile::new()?;
        let source = SqliteDataSource::open(file.path().to_string_lossy());
        Ok(DatabaseFixture {
            source,
            _file: file,
        })
    }

    /// Create a database and run `schema` against it
    pub fn with_schema(schema: &str) -> Result<Self> {
        let fixture = Self::new()?;
        let conn = fixture.source.acquire()?;
        conn.execute_batch(schema)
            .map_err(|e| crate::core::DaoError::query("Failed to apply fixture schema", e))?;
        Ok(fixture)
    }

    pub fn source(&self) -> &SqliteDataSource {
        &self.source
    }

    /// Row count of `table`, read through a fresh connection
    pub fn count(&self, table: &str) -> i64 {
        let conn = self.source.acquire().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_shared_across_connections() {
        let fixture = DatabaseFixture::with_schema(
            "CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1); INSERT INTO t VALUES (2);",
        )
        .unwrap();
        assert_eq!(fixture.count("t"), 2);
    }

    #[test]
    fn test_fixtures_are_isolated() {
        let a = DatabaseFixture::with_schema("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);").unwrap();
        let b = DatabaseFixture::with_schema("CREATE TABLE t (id INTEGER);").unwrap();
        assert_eq!(a.count("t"), 1);
        assert_eq!(b.count("t"), 0);
    }
}
