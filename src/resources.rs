/// SQL Resources Module
///
/// Named statements loaded from files, plus textual `?` substitution.

use crate::config::SqlConfig;
use crate::core::{DaoError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Named SQL statements, loaded once when constructed.
#[derive(Debug, Clone, Default)]
pub struct SqlResources {
    statements: HashMap<String, String>,
}

impl SqlResources {
    /// Reads every statement file named in `config`.
    ///
    /// Relative paths are resolved against `base_dir` when one is set.
    pub fn load(config: &SqlConfig) -> Result<Self> {
        let mut statements = HashMap::with_capacity(config.statements.len());
        for (name, file) in &config.statements {
            let path = match &config.base_dir {
                Some(base) if file.is_relative() => base.join(file),
                _ => file.clone(),
            };
            let sql = read_sql_file(&path)?;
            debug!("Loaded SQL '{}' from {:?}", name, path);
            statements.insert(name.clone(), sql);
        }
        Ok(SqlResources { statements })
    }

    /// Builds resources from in-memory statements.
    pub fn from_statements<I, K, V>(statements: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        SqlResources {
            statements: statements
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the SQL text registered under `name`.
    pub fn sql(&self, name: &str) -> Result<&str> {
        self.statements
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DaoError::Resource(format!("No SQL registered under '{}'", name)))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Reads a SQL file into a single line: tabs become spaces and lines are joined by a space.
pub fn read_sql_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .map_err(|e| DaoError::Resource(format!("Failed to read {}: {}", path.display(), e)))?;
    let sql = content
        .lines()
        .map(|line| line.replace('\t', " "))
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(sql)
}

/// Replaces each `?` in `query`, left to right, with the next value.
///
/// Returns `None` when there are no values, when `query` runs out of
/// placeholders before the values are used up, or when a placeholder is
/// left over afterwards. Substituted values are inserted verbatim and are
/// not themselves scanned for placeholders.
///
/// This differs from a substitution that rescans the whole string after
/// every replacement: there, a `?` inside a value would be consumed by the
/// next value. Here only the query's own placeholders are ever filled.
///
/// This is plain text substitution and does no quoting; use bind variables
/// for anything that reaches the driver from untrusted input.
pub fn replace_bind<S: AsRef<str>>(query: &str, values: &[S]) -> Option<String> {
    if values.is_empty() {
        return None;
    }

    let mut result = String::with_capacity(query.len());
    let mut rest = query;
    for value in values {
        let idx = rest.find('?')?;
        result.push_str(&rest[..idx]);
        result.push_str(value.as_ref());
        rest = &rest[idx + 1..];
    }

    if rest.contains('?') {
        return None;
    }
    result.push_str(rest);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_replace_bind() {
        assert_eq!(
            replace_bind("SELECT * FROM t WHERE a=? AND b=?", &["1", "2"]),
            Some("SELECT * FROM t WHERE a=1 AND b=2".to_string())
        );
    }

    #[test]
    fn test_replace_bind_failures() {
        let empty: [&str; 0] = [];
        assert_eq!(replace_bind("SELECT 1", &empty), None);
        // unresolved placeholder remains
        assert_eq!(replace_bind("a=? b=?", &["1"]), None);
        // more values than placeholders
        assert_eq!(replace_bind("a=?", &["1", "2"]), None);
        assert_eq!(replace_bind("SELECT 1", &["1"]), None);
    }

    #[test]
    fn test_replace_bind_does_not_rescan_values() {
        assert_eq!(
            replace_bind("a=? b=?", &["'?'", "2"]),
            Some("a='?' b=2".to_string())
        );
        // a bare `?` value stays in place instead of taking the next value
        assert_eq!(replace_bind("a=? b=?", &["?", "2"]), Some("a=? b=2".to_string()));
    }

    #[test]
    fn test_load_resources_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("find_user.sql")).unwrap();
        write!(file, "SELECT NAME,\n\tAGE\nFROM users\n\nWHERE ID = ?\n").unwrap();

        let mut statements = HashMap::new();
        statements.insert("find_user".to_string(), PathBuf::from("find_user.sql"));
        let config = SqlConfig {
            base_dir: Some(dir.path().to_path_buf()),
            statements,
        };

        let resources = SqlResources::load(&config).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources.sql("find_user").unwrap(),
            "SELECT NAME,  AGE FROM users WHERE ID = ?"
        );
    }

    #[test]
    fn test_unknown_statement_name() {
        let resources = SqlResources::from_statements([("a", "SELECT 1")]);
        assert_eq!(resources.sql("a").unwrap(), "SELECT 1");
        match resources.sql("b") {
            Err(DaoError::Resource(msg)) => assert!(msg.contains("'b'")),
            other => panic!("Expected Resource error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let mut statements = HashMap::new();
        statements.insert("gone".to_string(), PathBuf::from("/nonexistent/gone.sql"));
        let config = SqlConfig {
            base_dir: None,
            statements,
        };
        assert!(matches!(SqlResources::load(&config), Err(DaoError::Resource(_))));
    }
}
