//! Replays each legacy document's leaf revisions, with explicit history, into the destination.

use attachment_meta::merge_attachments;
use revision_tree::RevisionTree;
use serde::Serialize;
use std::ops::AddAssign;
use upgrade_core::{DigestEncoder, ImportedRevision, LegacyDocument, LegacySource, Result, RevisionSink};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub documents: u64,
    pub revisions: u64,
}

impl AddAssign for ImportCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.documents += rhs.documents;
        self.revisions += rhs.revisions;
    }
}

pub struct DocumentImporter<'a, S: LegacySource + ?Sized> {
    source: &'a S,
    encode: DigestEncoder,
}

impl<'a, S: LegacySource + ?Sized> DocumentImporter<'a, S> {
    pub fn new(source: &'a S, encode: DigestEncoder) -> Self {
        DocumentImporter { source, encode }
    }

    /// Every leaf of `doc`, bodies already carrying attachment metadata, in sequence order.
    /// Fails without returning anything if one leaf cannot be resolved.
    pub fn leaves(&self, doc: &LegacyDocument) -> Result<Vec<ImportedRevision>> {
        let mut tree = RevisionTree::new();
        let mut leaves = Vec::new();
        self.source
            .for_each_revision(doc, &mut |mut row| {
                if row.is_leaf && !row.no_attachments {
                    let rows = self.source.attachments(row.sequence)?;
                    row.body = merge_attachments(std::mem::take(&mut row.body), row.sequence, &rows, self.encode)?;
                }
                if let Some(leaf) = tree.push(row)? {
                    leaves.push(ImportedRevision {
                        doc_id: doc.doc_id.clone(),
                        rev_id: leaf.revision.rev_id,
                        deleted: leaf.revision.is_deleted,
                        body: leaf.revision.body,
                        history: leaf.history,
                    });
                }
                Ok(())
            })
            .map_err(|e| e.in_document(&doc.doc_id))?;
        Ok(leaves)
    }

    pub fn import(&self, doc: &LegacyDocument, sink: &mut dyn RevisionSink) -> Result<ImportCounts> {
        let leaves = self.leaves(doc)?;
        for rev in &leaves {
            sink.force_insert(rev)?;
        }
        log::debug!("imported {:?}: {} leaf revision(s)", doc.doc_id, leaves.len());
        Ok(ImportCounts { documents: 1, revisions: leaves.len() as u64 })
    }
}

/// Import every document of `source` into `sink`, stopping at the first failure.
pub fn import_all<S>(source: &S, encode: DigestEncoder, sink: &mut dyn RevisionSink) -> Result<ImportCounts>
where
    S: LegacySource + ?Sized,
{
    let importer = DocumentImporter::new(source, encode);
    let mut total = ImportCounts::default();
    source.for_each_document(&mut |doc| {
        total += importer.import(&doc, &mut *sink)?;
        Ok(())
    })?;
    Ok(total)
}
