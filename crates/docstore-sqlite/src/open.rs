use crate::schema::MIG_0001_INIT;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use upgrade_core::{Result, UpgradeError};
use uuid::Uuid;

/// Info keys that identify a store. The names match the legacy layout so an upgrade carries
/// the legacy identity over the freshly generated one.
pub const IDENTITY_KEYS: [&str; 2] = ["privateUUID", "publicUUID"];

pub struct DocStore {
    pub conn: Connection,
    pub(crate) path: PathBuf,
}

impl DocStore {
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| UpgradeError::store_open(&path, e))?;
        apply_pragmas(&conn).map_err(|e| UpgradeError::store_open(&path, e))?;
        migrate(&conn).map_err(|e| UpgradeError::store_open(&path, e))?;
        Ok(DocStore { conn, path })
    }

    /// Open a store that must already exist, for reading back. The schema is never touched
    /// and the connection refuses writes.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(UpgradeError::store_open(&path, "no such file"));
        }
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| UpgradeError::store_open(&path, e))?;
        conn.pragma_update(None, "query_only", true).map_err(|e| UpgradeError::store_open(&path, e))?;
        if !has_schema(&conn).map_err(|e| UpgradeError::store_open(&path, e))? {
            return Err(UpgradeError::store_open(&path, "not a document store"));
        }
        Ok(DocStore { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attachment_dir(&self) -> PathBuf {
        let stem = self.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.path.with_file_name(format!("{stem}.attachments"))
    }
}

/// Canonical text form of a blob content key.
pub fn encode_digest(key: &[u8]) -> String {
    format!("sha1-{}", STANDARD.encode(key))
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn has_schema(conn: &Connection) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='docs'",
        [],
        |r| r.get(0),
    )?;
    Ok(exists > 0)
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    if !has_schema(conn)? {
        conn.execute_batch(MIG_0001_INIT)?;
        for key in IDENTITY_KEYS {
            conn.execute(
                "INSERT INTO info(key, value) VALUES (?, ?)",
                params![key, Uuid::new_v4().simple().to_string()],
            )?;
        }
        log::debug!("initialised document store schema");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn digest_is_prefixed_base64() {
        assert_eq!(encode_digest(&[0u8; 20]), "sha1-AAAAAAAAAAAAAAAAAAAAAAAAAAA=");
    }

    #[test]
    fn create_then_reopen_keeps_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dest.db");
        let first = DocStore::open_or_create(&path).unwrap().info("privateUUID").unwrap();
        assert_eq!(first.as_deref().map(str::len), Some(32));
        let again = DocStore::open_or_create(&path).unwrap().info("privateUUID").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn open_existing_reads_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dest.db");
        assert!(DocStore::open_existing(&path).is_err());
        assert!(!path.exists());

        let id = DocStore::open_or_create(&path).unwrap().info("privateUUID").unwrap();
        let store = DocStore::open_existing(&path).unwrap();
        assert_eq!(store.info("privateUUID").unwrap(), id);
        assert!(store.conn.execute("DELETE FROM info", []).is_err());
    }

    #[test]
    fn open_existing_leaves_foreign_files_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE notes(body TEXT);").unwrap();
        let err = DocStore::open_existing(&path).err().unwrap();
        assert_eq!(err.kind(), upgrade_core::FailureKind::StoreOpen);
        let tables: i64 = Connection::open(&path)
            .unwrap()
            .query_row("SELECT COUNT(1) FROM sqlite_master WHERE type='table'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn attachment_dir_is_sibling() {
        let dir = TempDir::new().unwrap();
        let store = DocStore::open_or_create(dir.path().join("dest.db")).unwrap();
        assert_eq!(store.attachment_dir(), dir.path().join("dest.attachments"));
    }
}
