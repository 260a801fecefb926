use crate::Phase;
use doc_import::ImportCounts;
use serde::Serialize;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use upgrade_core::{FailureKind, UpgradeError};

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradeStatus {
    Success,
    Failed { kind: FailureKind, phase: Phase, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Relocation {
    /// The step never ran (an earlier step failed).
    Pending,
    Disabled,
    NotPresent,
    Moved { from: PathBuf, to: PathBuf },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalDocCounts {
    pub imported: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeReport {
    #[serde(flatten)]
    pub status: UpgradeStatus,
    #[serde(flatten)]
    pub imported: ImportCounts,
    pub local_documents: LocalDocCounts,
    pub info_keys: u64,
    pub attachments: Relocation,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_ms: u128,
}

impl UpgradeReport {
    pub(crate) fn started() -> Self {
        UpgradeReport {
            status: UpgradeStatus::Success,
            imported: ImportCounts::default(),
            local_documents: LocalDocCounts::default(),
            info_keys: 0,
            attachments: Relocation::Pending,
            started_at: now_rfc3339(),
            finished_at: String::new(),
            elapsed_ms: 0,
        }
    }

    pub(crate) fn fail(&mut self, phase: Phase, err: &UpgradeError) {
        self.status = UpgradeStatus::Failed { kind: err.kind(), phase, message: err.to_string() };
    }

    pub fn is_success(&self) -> bool {
        self.status == UpgradeStatus::Success
    }

    /// Non-fatal problems that still deserve attention.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.local_documents.skipped > 0 {
            out.push(format!("{} local document(s) skipped", self.local_documents.skipped));
        }
        if let Relocation::Failed { message } = &self.attachments {
            out.push(format!("attachments not relocated: {message}"));
        }
        out
    }
}
