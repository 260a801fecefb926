/// Tables every supported legacy file carries.
pub const LEGACY_TABLES: &[&str] = &["docs", "revs", "attachments", "localdocs", "info"];

/// Oldest `user_version` whose table layout this reader understands.
pub const MIN_SCHEMA_VERSION: i64 = 17;
/// First `user_version` that is no longer the legacy layout.
pub const MAX_SCHEMA_VERSION: i64 = 200;

/// Layout of the legacy tables. The reader never executes this; fixtures and tooling that need an
/// empty legacy file do.
pub const LEGACY_SCHEMA: &str = r#"
CREATE TABLE docs (
  doc_id          INTEGER PRIMARY KEY,
  docid           TEXT UNIQUE NOT NULL
);

CREATE TABLE revs (
  sequence        INTEGER PRIMARY KEY AUTOINCREMENT,
  doc_id          INTEGER NOT NULL REFERENCES docs(doc_id) ON DELETE CASCADE,
  revid           TEXT NOT NULL COLLATE REVID,
  parent          INTEGER REFERENCES revs(sequence) ON DELETE SET NULL,
  current         BOOLEAN,
  deleted         BOOLEAN DEFAULT 0,
  json            BLOB,
  no_attachments  BOOLEAN,
  UNIQUE (doc_id, revid)
);

CREATE TABLE localdocs (
  docid           TEXT UNIQUE NOT NULL,
  revid           TEXT NOT NULL COLLATE REVID,
  json            BLOB
);

CREATE TABLE attachments (
  sequence        INTEGER NOT NULL REFERENCES revs(sequence) ON DELETE CASCADE,
  filename        TEXT NOT NULL,
  key             BLOB NOT NULL,
  type            TEXT,
  length          INTEGER NOT NULL,
  revpos          INTEGER DEFAULT 0,
  encoding        INTEGER DEFAULT 0,
  encoded_length  INTEGER
);

CREATE TABLE info (
  key             TEXT PRIMARY KEY,
  value           TEXT
);

CREATE INDEX revs_by_docid ON revs(doc_id);
CREATE INDEX revs_current ON revs(doc_id, current);
CREATE INDEX attachments_by_sequence ON attachments(sequence, filename);
"#;
