//! Seams to the two stores the upgrade talks to.

use crate::error::Result;
use crate::model::{ImportedRevision, LegacyAttachment, LegacyDocument, LegacyLocalDocument, LegacyRevision, Sequence};
use std::path::PathBuf;

/// Maps a binary content key to the destination's textual digest form.
pub type DigestEncoder = fn(&[u8]) -> String;

/// Sequential, read-only access to the legacy tables.
pub trait LegacySource {
    /// Visit every document in table order. An error from `visit` stops the scan and is returned.
    fn for_each_document(&self, visit: &mut dyn FnMut(LegacyDocument) -> Result<()>) -> Result<()>;

    /// Visit one document's revisions in ascending sequence order.
    fn for_each_revision(
        &self,
        doc: &LegacyDocument,
        visit: &mut dyn FnMut(LegacyRevision) -> Result<()>,
    ) -> Result<()>;

    fn attachments(&self, sequence: Sequence) -> Result<Vec<LegacyAttachment>>;

    /// Visit every local document. A row that cannot be decoded reaches `visit` as an error and
    /// the scan continues; only a failure of the scan itself is returned.
    fn for_each_local_document(&self, visit: &mut dyn FnMut(Result<LegacyLocalDocument>)) -> Result<()>;

    fn info(&self) -> Result<Vec<(String, String)>>;

    fn attachment_dir(&self) -> PathBuf;
}

/// Receives replayed revisions while a destination transaction is open.
pub trait RevisionSink {
    fn force_insert(&mut self, rev: &ImportedRevision) -> Result<()>;
}

pub trait DocumentStore {
    /// Run `work` inside one transaction: commit on `Ok`, roll back on `Err`.
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RevisionSink) -> Result<T>;

    fn upsert_local(&mut self, doc_id: &str, body: &serde_json::Value) -> Result<()>;

    fn set_info(&mut self, key: &str, value: &str) -> Result<()>;

    fn digest_encoder(&self) -> DigestEncoder;

    fn attachment_dir(&self) -> PathBuf;
}
