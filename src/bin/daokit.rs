use clap::{ArgAction, Parser, Subcommand};
use daokit::config::{default_config_path, load_config, Config};
use daokit::core::db::{BindVariable, Row};
use daokit::resources::{replace_bind, SqlResources};
use daokit::{DaoError, SingleCallDao};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};

#[derive(Debug, Parser)]
#[command(name = "daokit")]
#[command(about = "Run bound SQL statements against a SQLite database", long_about = None)]
struct Args {
    /// Configuration file (default: <config dir>/daokit/config.toml if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the configured data source path
    #[arg(short = 'd', long, global = true)]
    db: Option<String>,

    /// Log more to stderr (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a query and print one JSON object per row
    Query {
        sql: String,
        /// Bind variable as kind:value (int, text, char, date), in placeholder order
        #[arg(short = 'b', long = "bind")]
        binds: Vec<BindVariable>,
    },
    /// Run an insert, update or delete in its own transaction
    Exec {
        sql: String,
        #[arg(short = 'b', long = "bind")]
        binds: Vec<BindVariable>,
    },
    /// Run a query registered under NAME in the [sql] configuration
    Named {
        name: String,
        /// Text substituted for each `?` before execution, in order
        #[arg(short = 's', long = "subst")]
        substitutions: Vec<String>,
        #[arg(short = 'b', long = "bind")]
        binds: Vec<BindVariable>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(args.config, args.db)?;
    debug!("Using database {}", config.datasource.path);
    let dao = SingleCallDao::from_config(&config);

    let mut out = io::stdout().lock();
    match args.command {
        Command::Query { sql, binds } => {
            let rows = dao.select_rows(&sql, &binds)?;
            print_rows(&mut out, rows)?;
        }
        Command::Exec { sql, binds } => {
            let outcome = dao.mutate(&sql, &binds)?;
            let report = serde_json::json!({
                "affected_rows": outcome.affected_rows,
                "completion": format!("{:?}", outcome.completion).to_lowercase(),
            });
            writeln!(out, "{}", report)?;
        }
        Command::Named {
            name,
            substitutions,
            binds,
        } => {
            let sql_config = config.sql.as_ref().ok_or_else(|| {
                DaoError::Config("named statements need an [sql] section".to_string())
            })?;
            let resources = SqlResources::load(sql_config)?;
            let mut sql = resources.sql(&name)?.to_string();
            if !substitutions.is_empty() {
                sql = replace_bind(&sql, &substitutions).ok_or_else(|| {
                    DaoError::Resource(format!(
                        "{} value(s) do not match the placeholders of '{}'",
                        substitutions.len(),
                        name
                    ))
                })?;
            }
            let rows = dao.select_rows(&sql, &binds)?;
            print_rows(&mut out, rows)?;
        }
    }
    Ok(())
}

/// Picks the configuration file, then applies `--db` on top of it.
fn resolve_config(path: Option<PathBuf>, db: Option<String>) -> daokit::Result<Config> {
    let path = path.or_else(|| default_config_path().filter(|p| p.exists()));
    match (path, db) {
        (Some(path), db) => {
            let mut config = load_config(&path)?;
            if let Some(db) = db {
                config.datasource.path = db;
            }
            Ok(config)
        }
        (None, Some(db)) => Ok(Config::for_path(db)),
        (None, None) => Err(DaoError::Config(
            "no database given: pass --db or a configuration file".to_string(),
        )),
    }
}

/// Writes each row as a JSON object with keys in column-name order.
fn print_rows(out: &mut impl Write, rows: Vec<Row>) -> Result<(), Box<dyn std::error::Error>> {
    for row in rows {
        let ordered: BTreeMap<String, _> = row.into_iter().collect();
        writeln!(out, "{}", serde_json::to_string(&ordered)?)?;
    }
    Ok(())
}
