//! Index-to-key mapping recovered from the store's reserved entries.

use crate::codec;
use crate::store::StoreEnv;
use crate::types::{CorpusDatasetError, DatasetResult};

/// Reserved key holding the serialized entry count.
pub const LEN_KEY: &[u8] = b"__len__";
/// Reserved key holding the serialized ordered key sequence.
pub const KEYS_KEY: &[u8] = b"__keys__";

/// The authoritative count and ordered key list of a store.
///
/// Built exactly once per dataset, immutable afterwards. Index `i` resolves
/// positionally to `keys[i]`; keys are opaque byte strings.
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    count: usize,
    keys: Vec<Vec<u8>>,
}

impl IndexCatalog {
    /// Recover the catalog from `__len__` and `__keys__`.
    ///
    /// The two entries must agree; a count that disagrees with the key list
    /// means the store build was interrupted or the metadata is corrupt.
    pub fn build(env: &StoreEnv) -> DatasetResult<Self> {
        let txn = env.begin_read();
        let raw_count = txn
            .get(LEN_KEY)
            .ok_or(CorpusDatasetError::MissingMetadata { key: "__len__" })?;
        let count = codec::decode_count(raw_count)? as usize;
        let raw_keys = txn
            .get(KEYS_KEY)
            .ok_or(CorpusDatasetError::MissingMetadata { key: "__keys__" })?;
        let keys = codec::decode_key_list(raw_keys)?;
        if keys.len() != count {
            return Err(CorpusDatasetError::CatalogIntegrity {
                count,
                keys: keys.len(),
            });
        }
        Ok(IndexCatalog { count, keys })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The key at position `index`, or `None` past the end.
    pub fn key(&self, index: usize) -> Option<&[u8]> {
        self.keys.get(index).map(Vec::as_slice)
    }

    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }
}
