//! Canonical CBOR encoding for envelope records.
//!
//! Every envelope is a CBOR map with small integer keys, encoded under the
//! RFC 8949 core deterministic rules:
//! - Map keys sorted by encoded byte comparison
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//!
//! Key 0 is always the record's `node_id`. Optional fields are always
//! written, with `null` marking absence. Decoding ignores unknown keys and
//! anything after the top-level map so newer producers can append fields.

use bytes::Bytes;
use ciborium::value::Value;

use crate::envelope::{FileEnvelope, ManifestEnvelope};
use crate::error::DecodeError;
use crate::types::{ContentAddress, NodeIdentity};

/// Manifest field keys.
mod manifest_keys {
    pub const NODE_ID: u64 = 0;
    pub const PARENT1: u64 = 1;
    pub const PARENT2: u64 = 2;
    pub const COMPUTED_NODE_ID: u64 = 3;
    pub const CONTENTS: u64 = 4;
}

/// File field keys.
mod file_keys {
    pub const NODE_ID: u64 = 0;
    pub const PARENT1: u64 = 1;
    pub const PARENT2: u64 = 2;
    pub const CONTENT_ADDRESS: u64 = 3;
    pub const CONTENT_SIZE: u64 = 4;
    pub const METADATA: u64 = 5;
}

/// Smallest possible manifest record: map head, node_id, computed_node_id.
pub const MIN_MANIFEST_LEN: usize = 1 + 2 * (1 + 1 + NodeIdentity::LEN);

/// Smallest possible file record: map head, node_id, one-byte content_size.
pub const MIN_FILE_LEN: usize = 1 + (1 + 1 + NodeIdentity::LEN) + 2;

/// The subset of CBOR an envelope is built from.
enum Item<'a> {
    Uint(u64),
    Bytes(&'a [u8]),
    Null,
}

impl<'a> Item<'a> {
    fn opt_bytes(value: Option<&'a [u8]>) -> Self {
        value.map_or(Item::Null, Item::Bytes)
    }
}

/// Encode a manifest envelope to canonical bytes.
pub fn encode_manifest(envelope: &ManifestEnvelope) -> Vec<u8> {
    use manifest_keys::*;

    let entries = vec![
        (NODE_ID, Item::Bytes(envelope.node_id.as_bytes())),
        (PARENT1, Item::opt_bytes(envelope.parent1.as_ref().map(|p| &p.as_bytes()[..]))),
        (PARENT2, Item::opt_bytes(envelope.parent2.as_ref().map(|p| &p.as_bytes()[..]))),
        (COMPUTED_NODE_ID, Item::Bytes(envelope.computed_node_id.as_bytes())),
        (CONTENTS, Item::opt_bytes(envelope.contents.as_deref())),
    ];
    encode_record(entries)
}

/// Encode a file envelope to canonical bytes.
pub fn encode_file(envelope: &FileEnvelope) -> Vec<u8> {
    use file_keys::*;

    let entries = vec![
        (NODE_ID, Item::Bytes(envelope.node_id.as_bytes())),
        (PARENT1, Item::opt_bytes(envelope.parent1.as_ref().map(|p| &p.as_bytes()[..]))),
        (PARENT2, Item::opt_bytes(envelope.parent2.as_ref().map(|p| &p.as_bytes()[..]))),
        (
            CONTENT_ADDRESS,
            Item::opt_bytes(envelope.content_address.as_ref().map(|a| &a.as_bytes()[..])),
        ),
        (CONTENT_SIZE, Item::Uint(envelope.content_size)),
        (METADATA, Item::opt_bytes(envelope.metadata.as_deref())),
    ];
    encode_record(entries)
}

/// Encode a record as a canonical map.
///
/// Keys are unsigned integers, so sorting by value is the same as sorting
/// by encoded bytes.
fn encode_record(mut entries: Vec<(u64, Item<'_>)>) -> Vec<u8> {
    entries.sort_by_key(|(key, _)| *key);

    let mut buf = Vec::new();
    encode_head(&mut buf, 5, entries.len() as u64);
    for (key, item) in &entries {
        encode_head(&mut buf, 0, *key);
        match item {
            Item::Uint(n) => encode_head(&mut buf, 0, *n),
            Item::Bytes(b) => {
                encode_head(&mut buf, 2, b.len() as u64);
                buf.extend_from_slice(b);
            }
            Item::Null => buf.push(0xf6),
        }
    }
    buf
}

/// Encode a major type head with the shortest argument encoding.
fn encode_head(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Decode a manifest envelope.
pub fn decode_manifest(bytes: &[u8]) -> Result<ManifestEnvelope, DecodeError> {
    use manifest_keys::*;

    let record = Record::parse(bytes, MIN_MANIFEST_LEN)?;
    Ok(ManifestEnvelope {
        node_id: record.required_node(NODE_ID, "node_id")?,
        parent1: record.optional_node(PARENT1, "parent1")?,
        parent2: record.optional_node(PARENT2, "parent2")?,
        computed_node_id: record.required_node(COMPUTED_NODE_ID, "computed_node_id")?,
        contents: record.optional_bytes(CONTENTS, "contents")?,
    })
}

/// Decode a file envelope.
pub fn decode_file(bytes: &[u8]) -> Result<FileEnvelope, DecodeError> {
    use file_keys::*;

    let record = Record::parse(bytes, MIN_FILE_LEN)?;
    let content_address = record
        .optional_bytes(CONTENT_ADDRESS, "content_address")?
        .map(|b| {
            ContentAddress::from_bytes(&b).map_err(|source| DecodeError::MalformedHash {
                field: "content_address",
                source,
            })
        })
        .transpose()?;

    Ok(FileEnvelope {
        node_id: record.required_node(NODE_ID, "node_id")?,
        parent1: record.optional_node(PARENT1, "parent1")?,
        parent2: record.optional_node(PARENT2, "parent2")?,
        content_address,
        content_size: record.required_uint(CONTENT_SIZE, "content_size")?,
        metadata: record.optional_bytes(METADATA, "metadata")?,
    })
}

/// A parsed top-level map.
struct Record {
    entries: Vec<(Value, Value)>,
}

impl Record {
    fn parse(bytes: &[u8], min_len: usize) -> Result<Self, DecodeError> {
        if bytes.len() < min_len {
            return Err(DecodeError::Truncated(bytes.len()));
        }

        // Reads exactly one item; trailing bytes are left unread.
        let value: Value = ciborium::from_reader(bytes).map_err(|e| match e {
            ciborium::de::Error::Io(_) => DecodeError::Truncated(bytes.len()),
            other => DecodeError::Malformed(other.to_string()),
        })?;

        match value {
            Value::Map(entries) => Ok(Self { entries }),
            _ => Err(DecodeError::Malformed("expected map".into())),
        }
    }

    /// Look up a field; `null` reads as absent.
    fn get(&self, key: u64) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
            .map(|(_, v)| v)
            .filter(|v| !matches!(v, Value::Null))
    }

    fn optional_bytes(&self, key: u64, field: &'static str) -> Result<Option<Bytes>, DecodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bytes(b)) => Ok(Some(Bytes::copy_from_slice(b))),
            Some(_) => Err(DecodeError::InvalidField {
                field,
                reason: "expected byte string".into(),
            }),
        }
    }

    fn optional_node(
        &self,
        key: u64,
        field: &'static str,
    ) -> Result<Option<NodeIdentity>, DecodeError> {
        self.optional_bytes(key, field)?
            .map(|b| {
                NodeIdentity::from_bytes(&b)
                    .map_err(|source| DecodeError::MalformedHash { field, source })
            })
            .transpose()
    }

    fn required_node(&self, key: u64, field: &'static str) -> Result<NodeIdentity, DecodeError> {
        self.optional_node(key, field)?
            .ok_or(DecodeError::MissingField(field))
    }

    fn required_uint(&self, key: u64, field: &'static str) -> Result<u64, DecodeError> {
        match self.get(key) {
            None => Err(DecodeError::MissingField(field)),
            Some(Value::Integer(i)) => {
                u64::try_from(i128::from(*i)).map_err(|_| DecodeError::InvalidField {
                    field,
                    reason: "expected unsigned integer".into(),
                })
            }
            Some(_) => Err(DecodeError::InvalidField {
                field,
                reason: "expected unsigned integer".into(),
            }),
        }
    }
}
