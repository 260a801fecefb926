use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Which legacy row an error refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub doc_id: Option<String>,
    pub sequence: Option<i64>,
}

impl Location {
    pub fn doc(doc_id: impl Into<String>) -> Self {
        Location { doc_id: Some(doc_id.into()), sequence: None }
    }

    pub fn sequence(sequence: i64) -> Self {
        Location { doc_id: None, sequence: Some(sequence) }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.doc_id, self.sequence) {
            (Some(doc), Some(seq)) => write!(f, "doc {doc:?}, sequence {seq}"),
            (Some(doc), None) => write!(f, "doc {doc:?}"),
            (None, Some(seq)) => write!(f, "sequence {seq}"),
            (None, None) => f.write_str("store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("cannot open store at {path:?}: {reason}")]
    StoreOpen { path: PathBuf, reason: String },
    #[error("legacy store is corrupt at {location}: {detail}")]
    Corruption { location: Location, detail: String },
    #[error("destination rejected {target}: {reason}")]
    Rejected { target: String, reason: String },
    #[error("local document {doc_id:?} skipped: {reason}")]
    LocalDocument { doc_id: String, reason: String },
    #[error("cannot move attachments from {from:?} to {to:?}: {source}")]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StoreOpen,
    Corruption,
    DestinationRejection,
    LocalDocument,
    AttachmentRelocation,
}

impl UpgradeError {
    pub fn corruption(location: Location, detail: impl Into<String>) -> Self {
        UpgradeError::Corruption { location, detail: detail.into() }
    }

    pub fn store_open(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        UpgradeError::StoreOpen { path: path.into(), reason: reason.to_string() }
    }

    pub fn rejected(doc_id: &str, rev_id: &str, reason: impl fmt::Display) -> Self {
        UpgradeError::Rejected { target: format!("doc {doc_id:?} rev {rev_id:?}"), reason: reason.to_string() }
    }

    pub fn rejected_info(key: &str, reason: impl fmt::Display) -> Self {
        UpgradeError::Rejected { target: format!("info key {key:?}"), reason: reason.to_string() }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            UpgradeError::StoreOpen { .. } => FailureKind::StoreOpen,
            UpgradeError::Corruption { .. } => FailureKind::Corruption,
            UpgradeError::Rejected { .. } => FailureKind::DestinationRejection,
            UpgradeError::LocalDocument { .. } => FailureKind::LocalDocument,
            UpgradeError::Relocation { .. } => FailureKind::AttachmentRelocation,
        }
    }

    /// Fill in the document id on a corruption error raised below the importer.
    pub fn in_document(self, doc_id: &str) -> Self {
        match self {
            UpgradeError::Corruption { mut location, detail } => {
                if location.doc_id.is_none() {
                    location.doc_id = Some(doc_id.to_string());
                }
                UpgradeError::Corruption { location, detail }
            }
            other => other,
        }
    }
}
