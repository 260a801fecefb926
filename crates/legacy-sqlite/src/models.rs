use serde::Serialize;

/// Row counts reported by `LegacyDb::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyStats {
    pub schema_version: i64,
    pub documents: i64,
    pub revisions: i64,
    pub leaf_revisions: i64,
    pub conflicted_documents: i64,
    pub attachments: i64,
    pub local_documents: i64,
    pub info_keys: i64,
    pub attachment_dir_present: bool,
}
