//! Drives a full legacy-to-docstore upgrade: documents, local documents, metadata, attachments.

mod relocate;
mod report;

pub use relocate::relocate_attachments;
pub use report::{LocalDocCounts, Relocation, UpgradeReport, UpgradeStatus};

use doc_import::{import_all, ImportCounts};
use legacy_sqlite::LegacyDb;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use upgrade_core::{DocumentStore, LegacyLocalDocument, LegacySource, Result, UpgradeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    OpeningStores,
    ImportingDocuments,
    ImportingLocalDocs,
    ImportingMetadata,
    RelocatingAttachments,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOptions {
    pub relocate_attachments: bool,
    /// Remove the legacy file once every step has succeeded.
    pub delete_source: bool,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        UpgradeOptions { relocate_attachments: true, delete_source: false }
    }
}

pub struct Upgrader {
    options: UpgradeOptions,
    phase: Phase,
}

impl Upgrader {
    pub fn new(options: UpgradeOptions) -> Self {
        Upgrader { options, phase: Phase::NotStarted }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        log::info!("upgrade: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Upgrade the legacy file at `source` into the store produced by `open_destination`.
    /// The legacy file is opened first so a bad source never creates an empty destination.
    pub fn run<D, F>(&mut self, source: &Path, open_destination: F) -> UpgradeReport
    where
        D: DocumentStore,
        F: FnOnce() -> Result<D>,
    {
        let started = Instant::now();
        let mut report = UpgradeReport::started();
        self.enter(Phase::OpeningStores);
        let opened = LegacyDb::open_read_only(source).and_then(|legacy| Ok((legacy, open_destination()?)));
        match opened {
            Ok((legacy, mut dest)) => {
                self.run_steps(&legacy, &mut dest, &mut report);
                drop(legacy);
                let relocated = !matches!(report.attachments, Relocation::Failed { .. });
                if self.phase == Phase::Done && relocated && self.options.delete_source {
                    relocate::delete_legacy_files(source);
                }
            }
            Err(e) => self.fail(&mut report, &e),
        }
        self.finish(report, started)
    }

    /// Run every step after the stores are open.
    pub fn run_with<S, D>(&mut self, legacy: &S, dest: &mut D) -> UpgradeReport
    where
        S: LegacySource + ?Sized,
        D: DocumentStore,
    {
        let started = Instant::now();
        let mut report = UpgradeReport::started();
        self.run_steps(legacy, dest, &mut report);
        self.finish(report, started)
    }

    fn run_steps<S, D>(&mut self, legacy: &S, dest: &mut D, report: &mut UpgradeReport)
    where
        S: LegacySource + ?Sized,
        D: DocumentStore,
    {
        if let Err(e) = self.steps(legacy, dest, report) {
            self.fail(report, &e);
            return;
        }
        self.enter(Phase::Done);
    }

    fn steps<S, D>(&mut self, legacy: &S, dest: &mut D, report: &mut UpgradeReport) -> Result<()>
    where
        S: LegacySource + ?Sized,
        D: DocumentStore,
    {
        self.enter(Phase::ImportingDocuments);
        report.imported = import_documents(legacy, dest)?;
        log::info!("imported {} document(s), {} revision(s)", report.imported.documents, report.imported.revisions);

        self.enter(Phase::ImportingLocalDocs);
        report.local_documents = import_local_documents(legacy, dest)?;

        self.enter(Phase::ImportingMetadata);
        for (key, value) in legacy.info()? {
            dest.set_info(&key, &value)?;
            report.info_keys += 1;
        }

        self.enter(Phase::RelocatingAttachments);
        report.attachments = if self.options.relocate_attachments {
            match relocate_attachments(&legacy.attachment_dir(), &dest.attachment_dir()) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("{e}");
                    Relocation::Failed { message: e.to_string() }
                }
            }
        } else {
            Relocation::Disabled
        };
        Ok(())
    }

    fn fail(&mut self, report: &mut UpgradeReport, err: &UpgradeError) {
        log::error!("upgrade failed during {:?}: {err}", self.phase);
        report.fail(self.phase, err);
        self.phase = Phase::Failed;
    }

    fn finish(&self, mut report: UpgradeReport, started: Instant) -> UpgradeReport {
        report.finished_at = report::now_rfc3339();
        report.elapsed_ms = started.elapsed().as_millis();
        report
    }
}

/// All documents in one transaction; any failure rolls every document back.
fn import_documents<S, D>(legacy: &S, dest: &mut D) -> Result<ImportCounts>
where
    S: LegacySource + ?Sized,
    D: DocumentStore,
{
    let encode = dest.digest_encoder();
    dest.in_transaction(|sink| import_all(legacy, encode, sink))
}

fn import_local_documents<S, D>(legacy: &S, dest: &mut D) -> Result<LocalDocCounts>
where
    S: LegacySource + ?Sized,
    D: DocumentStore,
{
    let mut counts = LocalDocCounts::default();
    legacy.for_each_local_document(&mut |row| {
        let imported = row.and_then(|doc| {
            let body = decode_local(&doc)?;
            dest.upsert_local(&doc.doc_id, &body)
        });
        match imported {
            Ok(()) => counts.imported += 1,
            Err(e) => {
                log::warn!("{e}");
                counts.skipped += 1;
            }
        }
    })?;
    Ok(counts)
}

fn decode_local(doc: &LegacyLocalDocument) -> Result<serde_json::Value> {
    let skip = |reason: String| UpgradeError::LocalDocument { doc_id: doc.doc_id.clone(), reason };
    match serde_json::from_slice(&doc.body) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(_) => Err(skip("body is not a JSON object".into())),
        Err(e) => Err(skip(e.to_string())),
    }
}

/// Convenience wrapper: run one upgrade with `options`.
pub fn upgrade<D, F>(source: &Path, options: UpgradeOptions, open_destination: F) -> UpgradeReport
where
    D: DocumentStore,
    F: FnOnce() -> Result<D>,
{
    Upgrader::new(options).run(source, open_destination)
}
