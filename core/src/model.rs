/// Physical row order of the legacy `revs` table. Zero means "no parent".
pub type Sequence = i64;

/// Byte length of a legacy attachment content key (a SHA-1 digest).
pub const CONTENT_KEY_LEN: usize = 20;

/// Body used for revisions whose stored JSON is NULL.
pub const EMPTY_BODY: &[u8] = b"{}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDocument {
    /// Surrogate key joining `docs` to `revs`; never leaves the adapter/importer pair.
    pub numeric_id: i64,
    pub doc_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRevision {
    pub sequence: Sequence,
    pub doc_numeric_id: i64,
    pub rev_id: String,
    pub parent_sequence: Sequence,
    pub is_leaf: bool,
    pub is_deleted: bool,
    pub body: Vec<u8>,
    pub no_attachments: bool,
}

impl LegacyRevision {
    pub fn has_parent(&self) -> bool {
        self.parent_sequence > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentEncoding {
    None,
    Gzip,
}

impl AttachmentEncoding {
    /// Decode the integer stored in the legacy `attachments.encoding` column.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AttachmentEncoding::None),
            1 => Some(AttachmentEncoding::Gzip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            AttachmentEncoding::None => None,
            AttachmentEncoding::Gzip => Some("gzip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyAttachment {
    pub sequence: Sequence,
    pub filename: String,
    pub content_key: Vec<u8>,
    pub mime_type: Option<String>,
    pub length: i64,
    pub revpos: i64,
    pub encoding: AttachmentEncoding,
    pub encoded_length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLocalDocument {
    pub doc_id: String,
    pub rev_id: String,
    pub body: Vec<u8>,
}

/// One leaf revision ready for forced insertion, with its ancestry newest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRevision {
    pub doc_id: String,
    pub rev_id: String,
    pub deleted: bool,
    pub body: Vec<u8>,
    pub history: Vec<String>,
}
