use crate::{LegacyDb, LegacyStats};
use rusqlite::types::ValueRef;
use rusqlite::Row;
use std::path::PathBuf;
use upgrade_core::{
    AttachmentEncoding, LegacyAttachment, LegacyDocument, LegacyLocalDocument, LegacyRevision, LegacySource, Location,
    Result, Sequence, UpgradeError, EMPTY_BODY,
};

const LOCAL_PREFIX: &str = "_local/";

fn corrupt(location: Location) -> impl FnOnce(rusqlite::Error) -> UpgradeError {
    move |e| UpgradeError::corruption(location, e.to_string())
}

/// JSON columns were written as BLOB by the legacy engine but as TEXT by some tools.
fn json_column(r: &Row, idx: usize) -> rusqlite::Result<Option<Vec<u8>>> {
    match r.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(b) => Ok(Some(b.to_vec())),
        ValueRef::Text(t) => Ok(Some(t.to_vec())),
        other => Err(rusqlite::Error::InvalidColumnType(idx, "json".into(), other.data_type())),
    }
}

fn revision_from_row(r: &Row) -> rusqlite::Result<LegacyRevision> {
    Ok(LegacyRevision {
        sequence: r.get(0)?,
        doc_numeric_id: r.get(1)?,
        rev_id: r.get(2)?,
        parent_sequence: r.get::<_, Option<i64>>(3)?.unwrap_or(0),
        is_leaf: r.get::<_, Option<bool>>(4)?.unwrap_or(false),
        is_deleted: r.get::<_, Option<bool>>(5)?.unwrap_or(false),
        body: json_column(r, 6)?.unwrap_or_else(|| EMPTY_BODY.to_vec()),
        no_attachments: r.get::<_, Option<bool>>(7)?.unwrap_or(false),
    })
}

/// Decode one `localdocs` row. Failures name the row so the caller can skip it.
fn local_from_row(r: &Row) -> Result<LegacyLocalDocument> {
    let rowid: i64 = r.get(0).map_err(corrupt(Location::default()))?;
    let doc_id = match r.get::<_, String>(1) {
        Ok(id) => id.strip_prefix(LOCAL_PREFIX).map(str::to_string).unwrap_or(id),
        Err(e) => return Err(UpgradeError::LocalDocument { doc_id: format!("rowid {rowid}"), reason: e.to_string() }),
    };
    let skip = |e: rusqlite::Error| UpgradeError::LocalDocument { doc_id: doc_id.clone(), reason: e.to_string() };
    let rev_id: String = r.get(2).map_err(skip)?;
    let body = json_column(r, 3).map_err(skip)?;
    Ok(LegacyLocalDocument { doc_id, rev_id, body: body.unwrap_or_default() })
}

impl LegacyDb {
    fn count(&self, sql: &str) -> Result<i64> {
        self.conn.query_row(sql, [], |r| r.get(0)).map_err(corrupt(Location::default()))
    }

    pub fn stats(&self) -> Result<LegacyStats> {
        Ok(LegacyStats {
            schema_version: self.schema_version()?,
            documents: self.count("SELECT COUNT(1) FROM docs")?,
            revisions: self.count("SELECT COUNT(1) FROM revs")?,
            leaf_revisions: self.count("SELECT COUNT(1) FROM revs WHERE current=1")?,
            conflicted_documents: self.count(
                "SELECT COUNT(1) FROM (SELECT doc_id FROM revs WHERE current=1 GROUP BY doc_id HAVING COUNT(1) > 1)",
            )?,
            attachments: self.count("SELECT COUNT(1) FROM attachments")?,
            local_documents: self.count("SELECT COUNT(1) FROM localdocs")?,
            info_keys: self.count("SELECT COUNT(1) FROM info")?,
            attachment_dir_present: LegacySource::attachment_dir(self).is_dir(),
        })
    }
}

impl LegacySource for LegacyDb {
    fn for_each_document(&self, visit: &mut dyn FnMut(LegacyDocument) -> Result<()>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT doc_id, docid FROM docs ORDER BY doc_id")
            .map_err(corrupt(Location::default()))?;
        let mut rows = stmt.query([]).map_err(corrupt(Location::default()))?;
        while let Some(row) = rows.next().map_err(corrupt(Location::default()))? {
            let doc = LegacyDocument {
                numeric_id: row.get(0).map_err(corrupt(Location::default()))?,
                doc_id: row.get(1).map_err(corrupt(Location::default()))?,
            };
            visit(doc)?;
        }
        Ok(())
    }

    fn for_each_revision(
        &self,
        doc: &LegacyDocument,
        visit: &mut dyn FnMut(LegacyRevision) -> Result<()>,
    ) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT sequence, doc_id, revid, parent, current, deleted, json, no_attachments
                 FROM revs WHERE doc_id=? ORDER BY sequence",
            )
            .map_err(corrupt(Location::doc(&doc.doc_id)))?;
        let mut rows = stmt.query([doc.numeric_id]).map_err(corrupt(Location::doc(&doc.doc_id)))?;
        while let Some(row) = rows.next().map_err(corrupt(Location::doc(&doc.doc_id)))? {
            let rev = revision_from_row(row).map_err(corrupt(Location::doc(&doc.doc_id)))?;
            visit(rev)?;
        }
        Ok(())
    }

    fn attachments(&self, sequence: Sequence) -> Result<Vec<LegacyAttachment>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT filename, key, type, length, revpos, encoding, encoded_length
                 FROM attachments WHERE sequence=? ORDER BY filename",
            )
            .map_err(corrupt(Location::sequence(sequence)))?;
        let raw = stmt
            .query_map([sequence], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Vec<u8>>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, i64>(3)?,
                    r.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    r.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    r.get::<_, Option<i64>>(6)?,
                ))
            })
            .map_err(corrupt(Location::sequence(sequence)))?;
        let mut out = Vec::new();
        for row in raw {
            let (filename, content_key, mime_type, length, revpos, code, encoded_length) =
                row.map_err(corrupt(Location::sequence(sequence)))?;
            let encoding = AttachmentEncoding::from_code(code).ok_or_else(|| {
                UpgradeError::corruption(
                    Location::sequence(sequence),
                    format!("attachment {filename:?} has unknown encoding {code}"),
                )
            })?;
            out.push(LegacyAttachment { sequence, filename, content_key, mime_type, length, revpos, encoding, encoded_length });
        }
        Ok(out)
    }

    fn for_each_local_document(&self, visit: &mut dyn FnMut(Result<LegacyLocalDocument>)) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT rowid, docid, revid, json FROM localdocs ORDER BY rowid")
            .map_err(corrupt(Location::default()))?;
        let mut rows = stmt.query([]).map_err(corrupt(Location::default()))?;
        while let Some(row) = rows.next().map_err(corrupt(Location::default()))? {
            visit(local_from_row(row));
        }
        Ok(())
    }

    fn info(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key, value FROM info ORDER BY key")
            .map_err(corrupt(Location::default()))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?)))
            .map_err(corrupt(Location::default()))?;
        let mut out = Vec::new();
        for row in rows {
            match row.map_err(corrupt(Location::default()))? {
                (key, Some(value)) => out.push((key, value)),
                (key, None) => log::debug!("info key {key:?} has no value, skipped"),
            }
        }
        Ok(out)
    }

    fn attachment_dir(&self) -> PathBuf {
        let stem = self.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.path.with_file_name(format!("{stem} attachments"))
    }
}
