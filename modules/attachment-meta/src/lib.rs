//! Builds `_attachments` metadata from legacy attachment rows and merges it into a JSON body.

use serde::Serialize;
use serde_json::{Map, Value};
use upgrade_core::{DigestEncoder, LegacyAttachment, Location, Result, Sequence, UpgradeError, CONTENT_KEY_LEN};

pub const ATTACHMENTS_KEY: &str = "_attachments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentMeta {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub digest: String,
    pub length: i64,
    pub revpos: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_length: Option<i64>,
}

impl AttachmentMeta {
    pub fn from_row(row: &LegacyAttachment, encode: DigestEncoder) -> Result<Self> {
        if row.content_key.len() != CONTENT_KEY_LEN {
            return Err(UpgradeError::corruption(
                Location::sequence(row.sequence),
                format!(
                    "attachment {:?} has a {}-byte content key {}",
                    row.filename,
                    row.content_key.len(),
                    hex::encode(&row.content_key)
                ),
            ));
        }
        let encoding = row.encoding.as_str();
        let encoded_length = match (encoding, row.encoded_length) {
            (None, _) => None,
            (Some(_), Some(n)) => Some(n),
            (Some(enc), None) => {
                return Err(UpgradeError::corruption(
                    Location::sequence(row.sequence),
                    format!("attachment {:?} is {enc}-encoded but has no encoded length", row.filename),
                ))
            }
        };
        Ok(AttachmentMeta {
            content_type: row.mime_type.clone(),
            digest: encode(&row.content_key),
            length: row.length,
            revpos: row.revpos,
            encoding,
            encoded_length,
        })
    }
}

/// Filename to metadata record, one entry per row.
pub fn attachments_object(rows: &[LegacyAttachment], encode: DigestEncoder) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for row in rows {
        let meta = AttachmentMeta::from_row(row, encode)?;
        let value = serde_json::to_value(meta)
            .map_err(|e| UpgradeError::corruption(Location::sequence(row.sequence), e.to_string()))?;
        if out.insert(row.filename.clone(), value).is_some() {
            return Err(UpgradeError::corruption(
                Location::sequence(row.sequence),
                format!("duplicate attachment filename {:?}", row.filename),
            ));
        }
    }
    Ok(out)
}

/// Return `body` with an `_attachments` member describing `rows`.
///
/// With no rows the body is handed back untouched, byte for byte. Otherwise the body is parsed,
/// `_attachments` is inserted (replacing any existing member) and the object is re-serialised.
pub fn merge_attachments(body: Vec<u8>, sequence: Sequence, rows: &[LegacyAttachment], encode: DigestEncoder) -> Result<Vec<u8>> {
    if rows.is_empty() {
        return Ok(body);
    }
    let bad_body = |detail: String| UpgradeError::corruption(Location::sequence(sequence), detail);
    let mut object = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(bad_body("revision body is not a JSON object".into())),
        Err(e) => return Err(bad_body(format!("revision body is not valid JSON: {e}"))),
    };
    object.insert(ATTACHMENTS_KEY.to_string(), Value::Object(attachments_object(rows, encode)?));
    serde_json::to_vec(&object).map_err(|e| bad_body(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use upgrade_core::{AttachmentEncoding, FailureKind};

    fn hex_digest(key: &[u8]) -> String {
        format!("hex-{}", hex::encode(key))
    }

    fn att(name: &str, key_byte: u8, encoding: AttachmentEncoding, encoded_length: Option<i64>) -> LegacyAttachment {
        LegacyAttachment {
            sequence: 4,
            filename: name.into(),
            content_key: vec![key_byte; CONTENT_KEY_LEN],
            mime_type: Some("application/octet-stream".into()),
            length: 120,
            revpos: 2,
            encoding,
            encoded_length,
        }
    }

    fn merged(body: &str, rows: &[LegacyAttachment]) -> Value {
        let out = merge_attachments(body.as_bytes().to_vec(), 4, rows, hex_digest).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn plain_and_gzip_entries() {
        let rows = vec![
            att("photo.jpg", 1, AttachmentEncoding::None, None),
            att("note.txt.gz", 2, AttachmentEncoding::Gzip, Some(50)),
        ];
        let v = merged(r#"{"title":"hi"}"#, &rows);
        assert_eq!(v["title"], "hi");
        let photo = v["_attachments"]["photo.jpg"].as_object().unwrap();
        assert!(!photo.contains_key("encoding"));
        assert!(!photo.contains_key("encoded_length"));
        assert_eq!(photo["digest"], json!(hex_digest(&[1; 20])));
        assert_eq!(photo["type"], "application/octet-stream");
        assert_eq!(photo["length"], 120);
        assert_eq!(photo["revpos"], 2);
        let note = &v["_attachments"]["note.txt.gz"];
        assert_eq!(note["encoding"], "gzip");
        assert_eq!(note["encoded_length"], 50);
    }

    #[test]
    fn no_rows_leaves_bytes_untouched() {
        let body = b"{ \"b\" : 2,\n  \"a\": [1, 2] }".to_vec();
        let out = merge_attachments(body.clone(), 4, &[], hex_digest).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn empty_object_body() {
        let v = merged("{}", &[att("a", 3, AttachmentEncoding::None, None)]);
        assert_eq!(v.as_object().unwrap().len(), 1);
        assert!(v["_attachments"]["a"].is_object());
    }

    #[test]
    fn one_entry_per_filename() {
        let rows: Vec<_> = (0..6u8).map(|i| att(&format!("f{i}"), i, AttachmentEncoding::None, None)).collect();
        let v = merged(r#"{"k":"ü"}"#, &rows);
        let atts = v["_attachments"].as_object().unwrap();
        assert_eq!(atts.len(), 6);
        for i in 0..6u8 {
            assert_eq!(atts[&format!("f{i}")]["digest"], json!(hex_digest(&[i; 20])));
        }
        assert_eq!(v["k"], "ü");
    }

    #[test]
    fn replaces_existing_attachments_member() {
        let v = merged(r#"{"_attachments":{"old":{}}}"#, &[att("new", 9, AttachmentEncoding::None, None)]);
        let atts = v["_attachments"].as_object().unwrap();
        assert!(atts.contains_key("new"));
        assert!(!atts.contains_key("old"));
    }

    #[test]
    fn short_content_key_is_corruption() {
        let mut row = att("x", 1, AttachmentEncoding::None, None);
        row.content_key.truncate(12);
        let err = merge_attachments(b"{}".to_vec(), 4, &[row], hex_digest).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Corruption);
    }

    #[test]
    fn duplicate_filename_and_bad_bodies_are_corruption() {
        let rows = vec![att("x", 1, AttachmentEncoding::None, None), att("x", 2, AttachmentEncoding::None, None)];
        assert!(merge_attachments(b"{}".to_vec(), 4, &rows, hex_digest).is_err());
        let one = [att("x", 1, AttachmentEncoding::None, None)];
        assert!(merge_attachments(b"[1,2]".to_vec(), 4, &one, hex_digest).is_err());
        assert!(merge_attachments(b"{\"a\":".to_vec(), 4, &one, hex_digest).is_err());
        let gz = [att("y", 1, AttachmentEncoding::Gzip, None)];
        assert!(merge_attachments(b"{}".to_vec(), 4, &gz, hex_digest).is_err());
    }
}
