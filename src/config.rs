use crate::core::{DaoError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub datasource: DataSourceConfig,
    pub dao: Option<DaoConfig>,
    pub sql: Option<SqlConfig>,
}

/// Connection settings for the SQLite data source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataSourceConfig {
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
    pub journal_mode: Option<String>,
}

impl DataSourceConfig {
    /// Settings for `path` with every optional pragma left at the driver default
    pub fn with_path(path: impl Into<String>) -> Self {
        DataSourceConfig {
            path: path.into(),
            read_only: false,
            busy_timeout_ms: Some(5000),
            foreign_keys: None,
            journal_mode: None,
        }
    }
}

/// How a single-call mutation that touched no rows is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroRowPolicy {
    /// Issue an explicit COMMIT of the empty transaction
    Commit,
    /// Issue neither commit nor rollback; the connection is simply released
    Release,
}

impl Default for ZeroRowPolicy {
    fn default() -> Self {
        ZeroRowPolicy::Commit
    }
}

/// DAO behavior settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaoConfig {
    #[serde(default)]
    pub zero_row_policy: ZeroRowPolicy,
}

/// Mapping from logical statement names to SQL files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlConfig {
    /// Directory that relative statement paths are resolved against
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub statements: HashMap<String, PathBuf>,
}

impl Config {
    /// Configuration with only a data source path.
    pub fn for_path(path: impl Into<String>) -> Self {
        Config {
            datasource: DataSourceConfig::with_path(path),
            dao: None,
            sql: None,
        }
    }

    pub fn zero_row_policy(&self) -> ZeroRowPolicy {
        self.dao.as_ref().map(|d| d.zero_row_policy).unwrap_or_default()
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = daokit::config::load_config("daokit.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| DaoError::Config(format!("{}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| DaoError::Config(e.to_string()))
}

/// Default configuration file location, `<config dir>/daokit/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("daokit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[datasource]
path = "app.db"
busy_timeout_ms = 2500
foreign_keys = true
journal_mode = "WAL"

[dao]
zero_row_policy = "release"

[sql]
base_dir = "sql"

[sql.statements]
find_user = "find_user.sql"
count_users = "reports/count_users.sql"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = parse_config(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.datasource.path, "app.db");
        assert_eq!(config.datasource.busy_timeout_ms, Some(2500));
        assert_eq!(config.datasource.foreign_keys, Some(true));
        assert!(!config.datasource.read_only);
        assert_eq!(config.zero_row_policy(), ZeroRowPolicy::Release);

        if let Some(sql) = config.sql {
            assert_eq!(sql.base_dir, Some(PathBuf::from("sql")));
            assert_eq!(sql.statements.len(), 2);
            assert_eq!(sql.statements["find_user"], PathBuf::from("find_user.sql"));
        } else {
            panic!("SQL configuration not found");
        }
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config("[datasource]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.zero_row_policy(), ZeroRowPolicy::Commit);
        assert!(config.sql.is_none());
        assert_eq!(config.datasource.journal_mode, None);
    }

    #[test]
    fn test_invalid_config() {
        match parse_config("[dao]\nzero_row_policy = \"sometimes\"\n") {
            Err(DaoError::Config(_)) => {}
            other => panic!("Expected Config error, got {:?}", other),
        }
        assert!(matches!(load_config("/nonexistent/daokit.toml"), Err(DaoError::Config(_))));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("daokit/config.toml"));
        }
    }
}
