//! SQLite storage layer for Gestor

mod access_logs;
mod backend;
mod identities;
mod migrations;
mod pages;
mod parse;
mod profiles;
mod roles;
mod sessions;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;

pub use access_logs::AccessLogStore;
pub use backend::SqliteBackend;
pub use identities::{hash_password, verify_password, IdentityStore};
pub use pages::PageStore;
pub use profiles::ProfileStore;
pub use roles::RoleStore;
pub use sessions::SessionStore;
pub use traits::{AuthProvider, Backend, DataStore};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::get_current_version(&self.conn).unwrap_or(0)
    }

    pub fn identities(&self) -> IdentityStore<'_> {
        IdentityStore::new(&self.conn)
    }

    pub fn profiles(&self) -> ProfileStore<'_> {
        ProfileStore::new(&self.conn)
    }

    pub fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(&self.conn)
    }

    pub fn roles(&self) -> RoleStore<'_> {
        RoleStore::new(&self.conn)
    }

    pub fn pages(&self) -> PageStore<'_> {
        PageStore::new(&self.conn)
    }

    pub fn access_logs(&self) -> AccessLogStore<'_> {
        AccessLogStore::new(&self.conn)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_on_disk_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gestor.db");

        let db = Database::open(&path).unwrap();
        let version = db.schema_version();
        assert!(version > 0);
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.schema_version(), version);
    }
}
