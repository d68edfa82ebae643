use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled, settings::Style};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pypeep::config;
use pypeep::index::pypi::PypiIndex;
use pypeep::store::Store;
use pypeep::sync::runner::run_sync;

#[derive(Parser)]
#[command(name = "pypeep")]
#[command(version, about = "Keeps tracked Python package versions in sync with PyPI")]
struct Cli {
    /// Path to the SQLite database (overrides PYPEEP_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and persist the latest version of every tracked requirement
    Sync {
        /// Package index base URL
        #[arg(long, default_value = config::DEFAULT_INDEX_URL)]
        index_url: String,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Create the database schema
    Init {
        /// Insert the default starter requirements
        #[arg(long)]
        seed: bool,
    },
    /// Print the tracked requirements and their stored versions
    List,
    /// Track a new requirement
    Add { name: String },
    /// Stop tracking a requirement
    Remove { name: String },
}

#[derive(Tabled)]
struct RequirementRow {
    id: i64,
    name: String,
    current_version: String,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = config::resolve_db_path(cli.db, std::env::var(config::DB_PATH_ENV).ok());

    match cli.command {
        None => sync(&db_path, config::DEFAULT_INDEX_URL.to_string(), false),
        Some(Command::Sync { index_url, json }) => sync(&db_path, index_url, json),
        Some(Command::Init { seed }) => {
            let store = open_store(&db_path)?;
            if seed {
                let inserted = store.seed_defaults()?;
                info!("Seeded {} starter requirements", inserted);
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::List) => {
            let store = open_store(&db_path)?;
            let rows: Vec<RequirementRow> = store
                .all_requirements()?
                .into_iter()
                .map(|r| RequirementRow {
                    id: r.id,
                    name: r.name,
                    current_version: r.current_version.unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::psql());
            println!("{table}");
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Add { name }) => {
            let store = open_store(&db_path)?;
            if store.add(&name)? {
                info!("Now tracking {:?}", name);
            } else {
                info!("{:?} is already tracked", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Remove { name }) => {
            let store = open_store(&db_path)?;
            if store.remove(&name)? {
                info!("Stopped tracking {:?}", name);
            } else {
                info!("{:?} was not tracked", name);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn sync(db_path: &Path, index_url: String, json: bool) -> anyhow::Result<ExitCode> {
    let store = Arc::new(open_store(db_path)?);
    let index = Arc::new(PypiIndex::new(index_url));

    let report = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_sync(store, index))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn open_store(db_path: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(Store::open(db_path)?)
}
