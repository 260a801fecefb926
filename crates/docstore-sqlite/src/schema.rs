pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE docs (
  doc_key         INTEGER PRIMARY KEY AUTOINCREMENT,
  doc_id          TEXT NOT NULL UNIQUE
);

CREATE TABLE revs (
  rev_key         INTEGER PRIMARY KEY AUTOINCREMENT,
  doc_key         INTEGER NOT NULL REFERENCES docs(doc_key) ON DELETE CASCADE,
  rev_id          TEXT NOT NULL,
  generation      INTEGER NOT NULL CHECK (generation > 0),
  parent_rev_id   TEXT,
  deleted         INTEGER NOT NULL CHECK (deleted IN (0,1)) DEFAULT 0,
  current         INTEGER NOT NULL CHECK (current IN (0,1)) DEFAULT 0,
  body            BLOB,
  UNIQUE (doc_key, rev_id)
);

CREATE TABLE local_docs (
  doc_id          TEXT PRIMARY KEY,
  body            TEXT NOT NULL
);

CREATE TABLE info (
  key             TEXT PRIMARY KEY,
  value           TEXT NOT NULL
);

CREATE INDEX idx_revs_doc ON revs(doc_key);
CREATE INDEX idx_revs_current ON revs(doc_key, current);

COMMIT;
"#
;
