use crate::{encode_digest, DocKey, DocStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use upgrade_core::{revid, DigestEncoder, DocumentStore, ImportedRevision, Result, RevisionSink, UpgradeError};

/// Forced-insertion handle bound to an open transaction.
struct TxSink<'a> {
    conn: &'a Connection,
}

impl RevisionSink for TxSink<'_> {
    fn force_insert(&mut self, rev: &ImportedRevision) -> Result<()> {
        force_insert(self.conn, rev)
    }
}

impl DocumentStore for DocStore {
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RevisionSink) -> Result<T>,
    {
        let tx_err = |step: &str, e: rusqlite::Error| UpgradeError::Rejected { target: format!("transaction {step}"), reason: e.to_string() };
        let tx = self.conn.transaction().map_err(|e| tx_err("begin", e))?;
        let conn: &Connection = &tx;
        let out = work(&mut TxSink { conn })?;
        tx.commit().map_err(|e| tx_err("commit", e))?;
        Ok(out)
    }

    fn upsert_local(&mut self, doc_id: &str, body: &serde_json::Value) -> Result<()> {
        let local_err = |reason: String| UpgradeError::LocalDocument { doc_id: doc_id.to_string(), reason };
        let text = serde_json::to_string(body).map_err(|e| local_err(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO local_docs(doc_id, body) VALUES (?,?) ON CONFLICT(doc_id) DO UPDATE SET body=excluded.body",
                params![doc_id, text],
            )
            .map_err(|e| local_err(e.to_string()))?;
        Ok(())
    }

    fn set_info(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO info(key, value) VALUES (?,?) ON CONFLICT(key) DO UPDATE SET value=excluded.value",
                params![key, value],
            )
            .map_err(|e| UpgradeError::rejected_info(key, e))?;
        Ok(())
    }

    fn digest_encoder(&self) -> DigestEncoder {
        encode_digest
    }

    fn attachment_dir(&self) -> PathBuf {
        DocStore::attachment_dir(self)
    }
}

/// History must name the revision first and step back one generation per entry.
fn validate_history(rev: &ImportedRevision) -> Result<Vec<u64>> {
    let reject = |reason: String| UpgradeError::rejected(&rev.doc_id, &rev.rev_id, reason);
    if rev.history.first() != Some(&rev.rev_id) {
        return Err(reject("history does not start with the revision being inserted".into()));
    }
    let mut generations = Vec::with_capacity(rev.history.len());
    for id in &rev.history {
        let gen = revid::generation(id).ok_or_else(|| reject(format!("malformed revision id {id:?}")))?;
        if let Some(&newer) = generations.last() {
            if newer != gen + 1 {
                return Err(reject(format!("generation gap between {newer} and {id:?}")));
            }
        }
        generations.push(gen);
    }
    Ok(generations)
}

fn ensure_doc(conn: &Connection, doc_id: &str) -> rusqlite::Result<DocKey> {
    conn.execute("INSERT INTO docs(doc_id) VALUES (?) ON CONFLICT(doc_id) DO NOTHING", [doc_id])?;
    conn.query_row("SELECT doc_key FROM docs WHERE doc_id=?", [doc_id], |r| r.get(0))
}

pub(crate) fn force_insert(conn: &Connection, rev: &ImportedRevision) -> Result<()> {
    let generations = validate_history(rev)?;
    let sql_err = |e: rusqlite::Error| UpgradeError::rejected(&rev.doc_id, &rev.rev_id, e);
    let doc_key = ensure_doc(conn, &rev.doc_id).map_err(sql_err)?;

    let mut parent: Option<&str> = None;
    for (idx, rev_id) in rev.history.iter().enumerate().rev() {
        let leaf = idx == 0;
        let existing: Option<Option<String>> = conn
            .query_row(
                "SELECT parent_rev_id FROM revs WHERE doc_key=? AND rev_id=?",
                params![doc_key, rev_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        match existing {
            Some(stored_parent) => match (stored_parent.as_deref(), parent) {
                (Some(a), Some(b)) if a != b => {
                    return Err(UpgradeError::rejected(
                        &rev.doc_id,
                        &rev.rev_id,
                        format!("{rev_id:?} already has parent {a:?}, history says {b:?}"),
                    ));
                }
                (None, Some(p)) => {
                    conn.execute(
                        "UPDATE revs SET parent_rev_id=? WHERE doc_key=? AND rev_id=?",
                        params![p, doc_key, rev_id],
                    )
                    .map_err(sql_err)?;
                }
                _ => {}
            },
            None => {
                conn.execute(
                    "INSERT INTO revs(doc_key, rev_id, generation, parent_rev_id, deleted, current, body) VALUES (?,?,?,?,?,?,?)",
                    params![
                        doc_key,
                        rev_id,
                        generations[idx] as i64,
                        parent,
                        leaf && rev.deleted,
                        leaf,
                        if leaf { Some(rev.body.as_slice()) } else { None },
                    ],
                )
                .map_err(sql_err)?;
            }
        }
        if let Some(p) = parent {
            conn.execute("UPDATE revs SET current=0 WHERE doc_key=? AND rev_id=?", params![doc_key, p])
                .map_err(sql_err)?;
        }
        parent = Some(rev_id.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use upgrade_core::FailureKind;

    fn rev(doc: &str, history: &[&str], body: &str) -> ImportedRevision {
        ImportedRevision {
            doc_id: doc.into(),
            rev_id: history[0].into(),
            deleted: false,
            body: body.as_bytes().to_vec(),
            history: history.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn store(dir: &TempDir) -> DocStore {
        DocStore::open_or_create(dir.path().join("dest.db")).unwrap()
    }

    #[test]
    fn replays_linear_history() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        db.in_transaction(|sink| sink.force_insert(&rev("d", &["3-c", "2-b", "1-a"], r#"{"x":1}"#))).unwrap();
        let leaves = db.leaf_revisions("d").unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].rev_id, "3-c");
        assert_eq!(leaves[0].body_json(), Some(serde_json::json!({"x": 1})));
        assert_eq!(db.history("d", "3-c").unwrap(), vec!["3-c", "2-b", "1-a"]);
    }

    #[test]
    fn conflicting_leaves_share_ancestor() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        db.in_transaction(|sink| {
            sink.force_insert(&rev("d", &["2-aaa", "1-abc"], "{}"))?;
            sink.force_insert(&rev("d", &["2-bbb", "1-abc"], "{}"))
        })
        .unwrap();
        let ids: Vec<String> = db.leaf_revisions("d").unwrap().into_iter().map(|r| r.rev_id).collect();
        assert_eq!(ids, vec!["2-aaa", "2-bbb"]);
        assert_eq!(db.counts().unwrap().revisions, 3);
    }

    #[test]
    fn rejects_malformed_history() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        let err = db.in_transaction(|sink| sink.force_insert(&rev("d", &["3-c", "1-a"], "{}"))).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DestinationRejection);
        let mut wrong_head = rev("d", &["2-b", "1-a"], "{}");
        wrong_head.rev_id = "9-z".into();
        assert!(db.in_transaction(|sink| sink.force_insert(&wrong_head)).is_err());
        assert!(db.in_transaction(|sink| sink.force_insert(&rev("d", &["bogus"], "{}"))).is_err());
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        let res = db.in_transaction(|sink| {
            sink.force_insert(&rev("a", &["1-a"], "{}"))?;
            sink.force_insert(&rev("b", &["1-b"], "{}"))?;
            sink.force_insert(&rev("c", &["nope"], "{}"))
        });
        assert!(res.is_err());
        assert_eq!(db.counts().unwrap(), crate::StoreCounts::default());
    }

    #[test]
    fn reinserting_a_leaf_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        let r = rev("d", &["2-b", "1-a"], "{}");
        db.in_transaction(|sink| { sink.force_insert(&r)?; sink.force_insert(&r) }).unwrap();
        assert_eq!(db.counts().unwrap().revisions, 2);
        assert_eq!(db.counts().unwrap().leaf_revisions, 1);
    }

    #[test]
    fn local_docs_and_info_upsert() {
        let dir = TempDir::new().unwrap();
        let mut db = store(&dir);
        db.upsert_local("cp", &serde_json::json!({"seq": 1})).unwrap();
        db.upsert_local("cp", &serde_json::json!({"seq": 2})).unwrap();
        assert_eq!(db.local("cp").unwrap(), Some(serde_json::json!({"seq": 2})));
        db.set_info("privateUUID", "abc").unwrap();
        assert_eq!(db.info("privateUUID").unwrap().as_deref(), Some("abc"));
    }
}
