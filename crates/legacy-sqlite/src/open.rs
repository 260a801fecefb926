use crate::schema::{LEGACY_TABLES, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use upgrade_core::{revid, Result, UpgradeError};

pub struct LegacyDb {
    pub conn: Connection,
    pub(crate) path: PathBuf,
}

impl LegacyDb {
    /// Open a legacy file without ever writing to it.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(UpgradeError::store_open(&path, "no such file"));
        }
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| UpgradeError::store_open(&path, e))?;
        register_revid_collation(&conn).map_err(|e| UpgradeError::store_open(&path, e))?;
        check_schema(&conn).map_err(|reason| UpgradeError::store_open(&path, reason))?;
        log::debug!("opened legacy store {}", path.display());
        Ok(LegacyDb { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> Result<i64> {
        schema_version(&self.conn).map_err(|e| UpgradeError::store_open(&self.path, e))
    }
}

/// The legacy schema declares revision-id columns with `COLLATE REVID`; SQLite refuses to use
/// those indexes until the collation exists on the connection.
pub fn register_revid_collation(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_collation("REVID", revid::compare)
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.pragma_query_value(None, "user_version", |r| r.get(0))
}

fn check_schema(conn: &Connection) -> std::result::Result<(), String> {
    let version = schema_version(conn).map_err(|e| e.to_string())?;
    if !(MIN_SCHEMA_VERSION..MAX_SCHEMA_VERSION).contains(&version) {
        return Err(format!("unsupported legacy schema version {version}"));
    }
    for table in LEGACY_TABLES {
        let cnt: i64 = conn
            .query_row("SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?", [table], |r| r.get(0))
            .map_err(|e| e.to_string())?;
        if cnt == 0 {
            return Err(format!("missing table {table}"));
        }
    }
    Ok(())
}
