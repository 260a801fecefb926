#![allow(dead_code)]
use docstore_sqlite::DocStore;
use legacy_sqlite::{register_revid_collation, LEGACY_SCHEMA};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct LegacyFixture {
    pub dir: TempDir,
    pub path: PathBuf,
    conn: Connection,
}

impl LegacyFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.cblite");
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
        register_revid_collation(&conn).unwrap();
        conn.execute_batch(LEGACY_SCHEMA).unwrap();
        conn.pragma_update(None, "user_version", 101).unwrap();
        LegacyFixture { dir, path, conn }
    }

    pub fn doc(&self, numeric_id: i64, doc_id: &str) -> &Self {
        self.conn.execute("INSERT INTO docs(doc_id, docid) VALUES (?,?)", params![numeric_id, doc_id]).unwrap();
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rev_full(&self, doc: i64, sequence: i64, rev_id: &str, parent: Option<i64>, current: bool, deleted: bool, json: Option<&str>, no_attachments: bool) -> &Self {
        self.conn
            .execute(
                "INSERT INTO revs(sequence, doc_id, revid, parent, current, deleted, json, no_attachments) VALUES (?,?,?,?,?,?,?,?)",
                params![sequence, doc, rev_id, parent, current, deleted, json.map(|j| j.as_bytes().to_vec()), no_attachments],
            )
            .unwrap();
        self
    }

    /// Revision without attachments and with a small JSON body.
    pub fn rev(&self, doc: i64, sequence: i64, rev_id: &str, parent: Option<i64>, current: bool) -> &Self {
        let body = format!(r#"{{"rev":"{rev_id}"}}"#);
        self.rev_full(doc, sequence, rev_id, parent, current, false, Some(&body), true)
    }

    pub fn attachment(&self, sequence: i64, filename: &str, key_byte: u8, mime: &str, length: i64, encoding: i64, encoded_length: Option<i64>) -> &Self {
        self.conn
            .execute(
                "INSERT INTO attachments(sequence, filename, key, type, length, revpos, encoding, encoded_length) VALUES (?,?,?,?,?,?,?,?)",
                params![sequence, filename, vec![key_byte; 20], mime, length, 1, encoding, encoded_length],
            )
            .unwrap();
        self
    }

    pub fn local(&self, doc_id: &str, json: &str) -> &Self {
        self.conn
            .execute("INSERT INTO localdocs(docid, revid, json) VALUES (?,?,?)", params![doc_id, "1-local", json.as_bytes().to_vec()])
            .unwrap();
        self
    }

    /// Raw statement for rows the typed helpers cannot express.
    pub fn sql(&self, stmt: &str) -> &Self {
        self.conn.execute_batch(stmt).unwrap();
        self
    }

    pub fn info(&self, key: &str, value: &str) -> &Self {
        self.conn.execute("INSERT INTO info(key, value) VALUES (?,?)", params![key, value]).unwrap();
        self
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.dir.path().join("app attachments")
    }

    pub fn dest_path(&self) -> PathBuf {
        self.dir.path().join("app.docstore")
    }
}

pub fn open_dest(path: &Path) -> DocStore {
    DocStore::open_or_create(path).unwrap()
}
