//! File metadata headers.
//!
//! Copy and rename provenance travels in a header framed by `\x01\n`
//! markers, holding `key: value` lines:
//!
//! ```text
//! \x01\n
//! copy: old/path.txt\n
//! copyrev: <40 hex digits>\n
//! \x01\n
//! ```
//!
//! The header is hashed ahead of the content but is never counted in a
//! file's `content_size`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MetadataError;
use crate::types::NodeIdentity;

/// The header marker.
pub const MARKER: &[u8] = b"\x01\n";

/// A header with no entries.
pub const EMPTY_HEADER: &[u8] = b"\x01\n\x01\n";

const COPY_KEY: &str = "copy";
const COPYREV_KEY: &str = "copyrev";

/// Source of a copied or renamed file revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFrom {
    pub path: String,
    pub node: NodeIdentity,
}

/// Parsed metadata header, keys in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    entries: Vec<(String, String)>,
}

impl FileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header recording that the file was copied from `source`.
    pub fn copied_from(source: &CopyFrom) -> Self {
        Self::new()
            .with(COPY_KEY, &source.path)
            .with(COPYREV_KEY, &source.node.to_hex())
    }

    /// Append an entry.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy provenance, if both `copy` and a well-formed `copyrev` are set.
    pub fn copy_from(&self) -> Option<CopyFrom> {
        let path = self.get(COPY_KEY)?;
        let node = NodeIdentity::from_hex(self.get(COPYREV_KEY)?).ok()?;
        Some(CopyFrom {
            path: path.to_string(),
            node,
        })
    }

    /// Parse a complete header. The input must be exactly one framed block.
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let body = bytes
            .strip_prefix(MARKER)
            .ok_or(MetadataError::MissingOpenMarker)?;
        let end = find_marker(body).ok_or(MetadataError::MissingCloseMarker)?;
        if end + MARKER.len() != body.len() {
            return Err(MetadataError::MissingCloseMarker);
        }

        let mut entries = Vec::new();
        for line in body[..end].split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let text = std::str::from_utf8(line)
                .map_err(|_| MetadataError::InvalidLine(String::from_utf8_lossy(line).into()))?;
            let (key, value) = text
                .split_once(": ")
                .ok_or_else(|| MetadataError::InvalidLine(text.to_string()))?;
            entries.push((key.to_string(), value.to_string()));
        }

        Ok(Self { entries })
    }

    /// Encode to header bytes. Deterministic for a given entry order.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(MARKER);
        for (key, value) in &self.entries {
            buf.put_slice(key.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_u8(b'\n');
        }
        buf.put_slice(MARKER);
        buf.freeze()
    }
}

/// Whether content must be stored behind a header to stay unambiguous.
///
/// Content that itself begins with the marker would otherwise be mistaken
/// for a header when the file text is split again.
pub fn needs_metadata_header(content: &[u8]) -> bool {
    content.starts_with(MARKER)
}

/// Split a full file text into `(metadata, content)`.
pub fn split_file_text(raw: &Bytes) -> Result<(Option<Bytes>, Bytes), MetadataError> {
    if !raw.starts_with(MARKER) {
        return Ok((None, raw.clone()));
    }
    let end = find_marker(&raw[MARKER.len()..]).ok_or(MetadataError::MissingCloseMarker)?;
    let split = MARKER.len() + end + MARKER.len();
    Ok((Some(raw.slice(..split)), raw.slice(split..)))
}

/// Offset of the first marker in `bytes`.
fn find_marker(bytes: &[u8]) -> Option<usize> {
    bytes.windows(MARKER.len()).position(|w| w == MARKER)
}
