//! Decoding of the opaque serialized blobs stored per key.
//!
//! One generic deserializer, three typed wrappers. Each wrapper names the
//! shape it expects so a malformed blob fails with a precise error instead
//! of an untyped value leaking out.

use crate::types::{CorpusDatasetError, DatasetResult, RawRecord};
use serde::de::DeserializeOwned;

fn deserialize<T: DeserializeOwned>(buf: &[u8], what: &'static str) -> DatasetResult<T> {
    bincode::deserialize(buf).map_err(|e| CorpusDatasetError::Deserialize { what, source: e })
}

/// Decode the store's `__len__` payload.
pub fn decode_count(buf: &[u8]) -> DatasetResult<u64> {
    deserialize(buf, "entry count")
}

/// Decode the store's `__keys__` payload: the ordered key sequence.
pub fn decode_key_list(buf: &[u8]) -> DatasetResult<Vec<Vec<u8>>> {
    deserialize(buf, "key list")
}

/// Decode one data entry into an image-bytes/label record.
pub fn decode_record(buf: &[u8]) -> DatasetResult<RawRecord> {
    deserialize(buf, "image record")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_and_keys_decode() {
        let count = bincode::serialize(&3u64).unwrap();
        assert_eq!(decode_count(&count).unwrap(), 3);

        let keys: Vec<Vec<u8>> = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let blob = bincode::serialize(&keys).unwrap();
        assert_eq!(decode_key_list(&blob).unwrap(), keys);
    }

    #[test]
    fn record_decodes_from_two_element_shape() {
        let blob = bincode::serialize(&(b"imgdata".to_vec(), 17i64)).unwrap();
        let record = decode_record(&blob).unwrap();
        assert_eq!(record.image_bytes, b"imgdata");
        assert_eq!(record.label, 17);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut blob = bincode::serialize(&(b"imgdata".to_vec(), 17i64)).unwrap();
        blob.truncate(5);
        let err = decode_record(&blob).unwrap_err();
        assert!(matches!(
            err,
            CorpusDatasetError::Deserialize {
                what: "image record",
                ..
            }
        ));
    }
}
