use crate::{DocStore, StoreCounts, StoredRevision};
use anyhow::{anyhow, Result};
use rusqlite::{params, OptionalExtension, Row};

fn stored_revision(r: &Row) -> rusqlite::Result<StoredRevision> {
    Ok(StoredRevision {
        rev_id: r.get(0)?,
        generation: r.get(1)?,
        parent_rev_id: r.get(2)?,
        deleted: r.get(3)?,
        current: r.get(4)?,
        body: r.get(5)?,
    })
}

impl DocStore {
    pub fn document_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT doc_id FROM docs ORDER BY doc_key")?;
        let ids = stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Current revisions of a document, ordered by revision id.
    pub fn leaf_revisions(&self, doc_id: &str) -> Result<Vec<StoredRevision>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.rev_id, r.generation, r.parent_rev_id, r.deleted, r.current, r.body
             FROM revs r JOIN docs d ON d.doc_key = r.doc_key
             WHERE d.doc_id=? AND r.current=1",
        )?;
        let mut revs = stmt.query_map([doc_id], stored_revision)?.collect::<rusqlite::Result<Vec<_>>>()?;
        revs.sort_by(|a, b| upgrade_core::revid::compare(&a.rev_id, &b.rev_id));
        Ok(revs)
    }

    pub fn revision(&self, doc_id: &str, rev_id: &str) -> Result<Option<StoredRevision>> {
        let rev = self
            .conn
            .query_row(
                "SELECT r.rev_id, r.generation, r.parent_rev_id, r.deleted, r.current, r.body
                 FROM revs r JOIN docs d ON d.doc_key = r.doc_key
                 WHERE d.doc_id=? AND r.rev_id=?",
                params![doc_id, rev_id],
                stored_revision,
            )
            .optional()?;
        Ok(rev)
    }

    /// Ancestry of `rev_id`, newest first.
    pub fn history(&self, doc_id: &str, rev_id: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut cursor = Some(rev_id.to_string());
        while let Some(id) = cursor {
            let rev = self
                .revision(doc_id, &id)?
                .ok_or_else(|| anyhow!("revision {id:?} of {doc_id:?} not found"))?;
            cursor = rev.parent_rev_id;
            out.push(id);
        }
        Ok(out)
    }

    pub fn local(&self, doc_id: &str) -> Result<Option<serde_json::Value>> {
        let body: Option<String> = self
            .conn
            .query_row("SELECT body FROM local_docs WHERE doc_id=?", [doc_id], |r| r.get(0))
            .optional()?;
        Ok(body.map(|b| serde_json::from_str(&b)).transpose()?)
    }

    pub fn info(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM info WHERE key=?", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let count = |sql: &str| -> Result<i64> { Ok(self.conn.query_row(sql, [], |r| r.get(0))?) };
        Ok(StoreCounts {
            documents: count("SELECT COUNT(1) FROM docs")?,
            revisions: count("SELECT COUNT(1) FROM revs")?,
            leaf_revisions: count("SELECT COUNT(1) FROM revs WHERE current=1")?,
            local_documents: count("SELECT COUNT(1) FROM local_docs")?,
        })
    }
}
