use serde::Serialize;

pub type DocKey = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRevision {
    pub rev_id: String,
    pub generation: i64,
    pub parent_rev_id: Option<String>,
    pub deleted: bool,
    pub current: bool,
    #[serde(skip)]
    pub body: Option<Vec<u8>>,
}

impl StoredRevision {
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body.as_deref().and_then(|b| serde_json::from_slice(b).ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub documents: i64,
    pub revisions: i64,
    pub leaf_revisions: i64,
    pub local_documents: i64,
}
