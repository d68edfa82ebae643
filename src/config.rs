use std::path::PathBuf;

/// Default package index base URL
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Accept header value for the PyPI Simple API JSON variant
pub const SIMPLE_JSON_ACCEPT: &str = "application/vnd.pypi.simple.v1+json";

/// Environment variable overriding the database path
pub const DB_PATH_ENV: &str = "PYPEEP_DB_PATH";

/// Database file name inside the data directory
const DB_FILE_NAME: &str = "pypeep.db";

/// Resolve the database path from the CLI flag, the environment, or the
/// default location, in that order of precedence.
pub fn resolve_db_path(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.map(PathBuf::from))
        .unwrap_or_else(|| data_dir().join(DB_FILE_NAME))
}

/// Returns the path to the data directory for pypeep.
/// Uses $XDG_DATA_HOME/pypeep if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/pypeep,
/// or ./pypeep if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("pypeep")
}
