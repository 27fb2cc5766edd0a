//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use revstore_core::{
    file_node_id, manifest_node_id, ContentAddress, FileEnvelope, FileMetadata, ManifestEnvelope,
    NodeIdentity,
};

/// Generate a random NodeIdentity.
pub fn node_identity() -> impl Strategy<Value = NodeIdentity> {
    any::<[u8; 20]>().prop_map(NodeIdentity::from_array)
}

/// Generate a random ContentAddress.
pub fn content_address() -> impl Strategy<Value = ContentAddress> {
    any::<[u8; 32]>().prop_map(ContentAddress::from_array)
}

/// Generate an optional parent.
pub fn parent() -> impl Strategy<Value = Option<NodeIdentity>> {
    proptest::option::of(node_identity())
}

/// Generate content bytes of specified max length.
pub fn data(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a well-formed metadata header.
pub fn metadata_header() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(("[a-z]{1,8}", "[ -~]{0,24}"), 0..4).prop_map(|entries| {
        entries
            .iter()
            .fold(FileMetadata::new(), |meta, (k, v)| meta.with(k, v))
            .encode()
    })
}

/// Generate a manifest envelope with arbitrary, unrelated fields.
pub fn any_manifest_envelope() -> impl Strategy<Value = ManifestEnvelope> {
    (
        node_identity(),
        parent(),
        parent(),
        node_identity(),
        proptest::option::of(data(512)),
    )
        .prop_map(|(node_id, parent1, parent2, computed_node_id, contents)| {
            ManifestEnvelope {
                node_id,
                parent1,
                parent2,
                computed_node_id,
                contents: contents.map(Bytes::from),
            }
        })
}

/// Generate a file envelope with arbitrary, unrelated fields.
pub fn any_file_envelope() -> impl Strategy<Value = FileEnvelope> {
    (
        node_identity(),
        parent(),
        parent(),
        proptest::option::of(content_address()),
        any::<u64>(),
        proptest::option::of(data(128)),
    )
        .prop_map(
            |(node_id, parent1, parent2, content_address, content_size, metadata)| FileEnvelope {
                node_id,
                parent1,
                parent2,
                content_address,
                content_size,
                metadata: metadata.map(Bytes::from),
            },
        )
}

/// Parameters for a consistent manifest.
#[derive(Debug, Clone)]
pub struct ManifestParams {
    pub parent1: Option<NodeIdentity>,
    pub parent2: Option<NodeIdentity>,
    pub contents: Vec<u8>,
}

impl Arbitrary for ManifestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (parent(), parent(), data(1024))
            .prop_map(|(parent1, parent2, contents)| ManifestParams {
                parent1,
                parent2,
                contents,
            })
            .boxed()
    }
}

/// Build a manifest whose node_id is its content hash.
pub fn manifest_from_params(params: &ManifestParams) -> ManifestEnvelope {
    let node_id = manifest_node_id(
        params.parent1.as_ref(),
        params.parent2.as_ref(),
        &params.contents,
    );
    ManifestEnvelope {
        node_id,
        parent1: params.parent1,
        parent2: params.parent2,
        computed_node_id: node_id,
        contents: Some(Bytes::from(params.contents.clone())),
    }
}

/// Parameters for a consistent file revision.
#[derive(Debug, Clone)]
pub struct FileParams {
    pub parent1: Option<NodeIdentity>,
    pub parent2: Option<NodeIdentity>,
    pub content: Vec<u8>,
    pub metadata: Option<Bytes>,
}

impl Arbitrary for FileParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            parent(),
            parent(),
            data(1024),
            proptest::option::of(metadata_header()),
        )
            .prop_map(|(parent1, parent2, content, metadata)| FileParams {
                parent1,
                parent2,
                content,
                metadata,
            })
            .boxed()
    }
}

/// Build a file envelope whose node_id matches its content, together with
/// that content.
pub fn file_from_params(params: &FileParams) -> (FileEnvelope, Bytes) {
    let content = Bytes::from(params.content.clone());
    let node_id = file_node_id(
        params.parent1.as_ref(),
        params.parent2.as_ref(),
        params.metadata.as_deref(),
        &content,
    );
    let envelope = FileEnvelope {
        node_id,
        parent1: params.parent1,
        parent2: params.parent2,
        content_address: Some(ContentAddress::compute(&content)),
        content_size: content.len() as u64,
        metadata: params.metadata.clone(),
    };
    (envelope, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revstore_core::{verify_file, verify_manifest, Verification, VerificationError};

    proptest! {
        #[test]
        fn test_manifest_roundtrip(envelope in any_manifest_envelope()) {
            let bytes = envelope.encode();
            prop_assert_eq!(bytes.clone(), envelope.encode());
            prop_assert_eq!(ManifestEnvelope::decode(&bytes).unwrap(), envelope);
        }

        #[test]
        fn test_file_roundtrip(envelope in any_file_envelope()) {
            let bytes = envelope.encode();
            prop_assert_eq!(bytes.clone(), envelope.encode());
            prop_assert_eq!(FileEnvelope::decode(&bytes).unwrap(), envelope);
        }

        #[test]
        fn test_consistent_manifest_verifies(params: ManifestParams) {
            let envelope = manifest_from_params(&params);
            prop_assert_eq!(verify_manifest(&envelope, false), Ok(Verification::Consistent));
            prop_assert_eq!(verify_manifest(&envelope, true), Ok(Verification::Consistent));
        }

        #[test]
        fn test_root_exception_accepted(
            params in any::<ManifestParams>(),
            declared in node_identity(),
        ) {
            let mut envelope = manifest_from_params(&params);
            let computed = envelope.node_id;
            prop_assume!(declared != computed);
            envelope.node_id = declared;

            prop_assert_eq!(
                verify_manifest(&envelope, true),
                Ok(Verification::RootExceptionAccepted { computed })
            );
            let off_root = matches!(
                verify_manifest(&envelope, false),
                Err(VerificationError::HashMismatch { .. })
            );
            prop_assert!(off_root);
        }

        #[test]
        fn test_manifest_byte_corruption_detected(
            params in any::<ManifestParams>(),
            pick in any::<usize>(),
        ) {
            prop_assume!(!params.contents.is_empty());
            let envelope = manifest_from_params(&params);

            // Contents is the last field of the record, so its bytes end
            // the encoding.
            let mut bytes = envelope.encode();
            let offset = bytes.len() - 1 - pick % params.contents.len();
            bytes[offset] ^= 0x01;

            let decoded = ManifestEnvelope::decode(&bytes).unwrap();
            let corrupt = matches!(
                verify_manifest(&decoded, false),
                Err(VerificationError::HashMismatch { .. })
            );
            prop_assert!(corrupt);
        }

        #[test]
        fn test_consistent_file_verifies(params: FileParams) {
            let (envelope, content) = file_from_params(&params);
            prop_assert_eq!(envelope.content_size, params.content.len() as u64);
            prop_assert_eq!(verify_file(&envelope, &content), Ok(Verification::Consistent));
        }

        #[test]
        fn test_file_content_corruption_detected(
            params in any::<FileParams>(),
            pick in any::<usize>(),
        ) {
            prop_assume!(!params.content.is_empty());
            let (envelope, content) = file_from_params(&params);

            let mut corrupted = content.to_vec();
            let offset = pick % corrupted.len();
            corrupted[offset] ^= 0x01;

            let corrupt = matches!(
                verify_file(&envelope, &corrupted),
                Err(VerificationError::HashMismatch { .. })
            );
            prop_assert!(corrupt);
        }

        #[test]
        fn test_file_size_byte_corruption_detected(params: FileParams) {
            let (mut envelope, content) = file_from_params(&params);
            envelope.metadata = None;
            envelope.node_id = file_node_id(
                params.parent1.as_ref(),
                params.parent2.as_ref(),
                None,
                &content,
            );

            // With no metadata the record ends `05 f6`, right after the
            // content_size head.
            let mut bytes = envelope.encode();
            let len = bytes.len();
            prop_assert_eq!(&bytes[len - 2..], &[0x05, 0xf6][..]);
            bytes[len - 3] ^= 0x01;

            let decoded = FileEnvelope::decode(&bytes).unwrap();
            prop_assert_ne!(decoded.content_size, envelope.content_size);
            let corrupt = matches!(
                verify_file(&decoded, &content),
                Err(VerificationError::HashMismatch { .. })
            );
            prop_assert!(corrupt);
        }

        #[test]
        fn test_file_metadata_byte_corruption_detected(
            params in any::<FileParams>(),
            header in metadata_header(),
            pick in any::<usize>(),
        ) {
            let params = FileParams {
                metadata: Some(header.clone()),
                ..params
            };
            let (envelope, content) = file_from_params(&params);

            // Metadata is the last field, so its bytes end the encoding.
            let mut bytes = envelope.encode();
            let offset = bytes.len() - 1 - pick % header.len();
            bytes[offset] ^= 0x01;

            let decoded = FileEnvelope::decode(&bytes).unwrap();
            let corrupt = matches!(
                verify_file(&decoded, &content),
                Err(VerificationError::HashMismatch { .. })
            );
            prop_assert!(corrupt);
        }

        #[test]
        fn test_metadata_header_parses(header in metadata_header()) {
            let parsed = FileMetadata::parse(&header).unwrap();
            prop_assert_eq!(parsed.encode(), header);
        }
    }
}
