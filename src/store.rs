//! SQLite-backed storage for tracked requirements

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;

/// Starter requirements inserted by `init --seed`
const DEFAULT_SEED: &[&str] = &["flask", "pydantic", "pandas"];

/// One tracked requirement row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub id: i64,
    pub name: String,
    /// Last known version, unset before the first successful sync
    pub current_version: Option<String>,
}

/// Trait for the two store operations a sync run performs
#[cfg_attr(test, automock)]
pub trait RequirementStore: Send + Sync + 'static {
    /// Names of all tracked requirements
    fn list_names(&self) -> Result<Vec<String>, StoreError>;

    /// Set the current version for a tracked requirement
    fn set_current_version(&self, name: &str, version: &str) -> Result<(), StoreError>;
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening requirements database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        debug!("Database ready");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                current_version TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP
            )
            "#,
            [],
        )?;

        Ok(())
    }

    /// Insert the starter requirements, skipping names already tracked.
    /// Returns the number of rows inserted.
    pub fn seed_defaults(&self) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("INSERT OR IGNORE INTO requirements (name) VALUES (?1)")?;

        let mut inserted = 0;
        for name in DEFAULT_SEED {
            inserted += stmt.execute([name])?;
        }

        debug!("Seeded {} starter requirements", inserted);
        Ok(inserted)
    }

    /// Track a new requirement. Returns false if the name was already tracked.
    pub fn add(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "INSERT OR IGNORE INTO requirements (name) VALUES (?1)",
            [name],
        )?;

        Ok(rows > 0)
    }

    /// Stop tracking a requirement. Returns false if the name was not tracked.
    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM requirements WHERE name = ?1", [name])?;

        Ok(rows > 0)
    }

    /// All tracked requirements with their stored versions
    pub fn all_requirements(&self) -> Result<Vec<Requirement>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, current_version FROM requirements ORDER BY id")?;

        let requirements = stmt
            .query_map([], |row| {
                Ok(Requirement {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    current_version: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requirements)
    }
}

impl RequirementStore for Store {
    fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM requirements ORDER BY id")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }

    fn set_current_version(&self, name: &str, version: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE requirements
            SET current_version = ?1, updated_at = CURRENT_TIMESTAMP
            WHERE name = ?2
            "#,
            (version, name),
        )?;

        if rows == 0 {
            return Err(StoreError::UnknownRequirement(name.to_string()));
        }

        Ok(())
    }
}
