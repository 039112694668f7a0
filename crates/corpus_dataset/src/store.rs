//! Memory-mapped store environment and read-only transaction scope.

use crate::types::{CorpusDatasetError, DatasetResult};
use memmap2::{Mmap, MmapOptions};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

const STORE_MAGIC: &[u8; 4] = b"CPK1";
const STORE_VERSION: u32 = 1;
const HEADER_LEN: usize = 32;

/// File name looked up when the store path is a directory.
pub const STORE_FILE_NAME: &str = "corpus.pack";

/// A read-only memory-mapped store environment.
///
/// Opened once, held for the lifetime of the owning dataset, reclaimed at
/// process exit. The mapping and the key table are immutable after open, so
/// one environment may be shared across reader threads.
pub struct StoreEnv {
    path: PathBuf,
    mmap: Mmap,
    index: HashMap<Vec<u8>, (u64, u64)>,
}

impl StoreEnv {
    /// Open the store rooted at `path`.
    ///
    /// `path` may be a directory containing `corpus.pack` or the store file
    /// itself; the physical layout is detected from the filesystem type.
    pub fn open(path: &Path) -> DatasetResult<Self> {
        let t0 = Instant::now();
        let file_path = if path.is_dir() {
            path.join(STORE_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        let file = File::open(&file_path).map_err(|e| CorpusDatasetError::StoreOpen {
            path: file_path.clone(),
            source: e,
        })?;
        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .map_err(|e| CorpusDatasetError::StoreOpen {
                    path: file_path.clone(),
                    source: e,
                })?
        };
        let index = parse_index(&mmap, &file_path)?;
        println!(
            "[store] opened {} ({} entries) in {} ms",
            file_path.display(),
            index.len(),
            t0.elapsed().as_millis()
        );
        Ok(StoreEnv {
            path: path.to_path_buf(),
            mmap,
            index,
        })
    }

    /// Begin a read-only transaction scope. Never a write scope.
    pub fn begin_read(&self) -> ReadTxn<'_> {
        ReadTxn { env: self }
    }

    /// Number of entries in the store, reserved metadata included.
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A short-lived read-only view into an open store.
pub struct ReadTxn<'env> {
    env: &'env StoreEnv,
}

impl<'env> ReadTxn<'env> {
    /// Look up `key`, returning the raw value bytes or absence.
    pub fn get(&self, key: &[u8]) -> Option<&'env [u8]> {
        let &(offset, len) = self.env.index.get(key)?;
        Some(&self.env.mmap[offset as usize..(offset + len) as usize])
    }
}

fn read_u32_le(data: &[u8]) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(data);
    u32::from_le_bytes(arr)
}

fn read_u64_le(data: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(data);
    u64::from_le_bytes(arr)
}

/// Validate the header and parse the index region into a key table.
///
/// Every (offset, length) pair is bounds-checked here so lookups can slice
/// the mapping without re-validating.
fn parse_index(data: &[u8], path: &Path) -> DatasetResult<HashMap<Vec<u8>, (u64, u64)>> {
    let invalid = |reason: String| CorpusDatasetError::InvalidStore {
        path: path.to_path_buf(),
        reason,
    };

    if data.len() < HEADER_LEN {
        return Err(invalid("file shorter than store header".into()));
    }
    if &data[0..4] != STORE_MAGIC {
        return Err(invalid("bad magic".into()));
    }
    let version = read_u32_le(&data[4..8]);
    if version != STORE_VERSION {
        return Err(invalid(format!("unsupported store version {version}")));
    }
    let flags = read_u32_le(&data[8..12]);
    if flags != 0 {
        return Err(invalid(format!("unsupported flags {flags:#x}")));
    }
    let entry_count = read_u64_le(&data[16..24]) as usize;
    let index_offset = read_u64_le(&data[24..32]) as usize;
    if index_offset < HEADER_LEN || index_offset > data.len() {
        return Err(invalid(format!("index offset {index_offset} out of bounds")));
    }

    let mut index = HashMap::with_capacity(entry_count);
    let mut cursor = index_offset;
    for _ in 0..entry_count {
        if cursor + 4 > data.len() {
            return Err(invalid("index region truncated".into()));
        }
        let key_len = read_u32_le(&data[cursor..cursor + 4]) as usize;
        cursor += 4;
        if cursor + key_len + 16 > data.len() {
            return Err(invalid("index region truncated".into()));
        }
        let key = data[cursor..cursor + key_len].to_vec();
        cursor += key_len;
        let value_offset = read_u64_le(&data[cursor..cursor + 8]);
        cursor += 8;
        let value_len = read_u64_le(&data[cursor..cursor + 8]);
        cursor += 8;

        let end = value_offset
            .checked_add(value_len)
            .ok_or_else(|| invalid("value extent overflows".into()))?;
        if value_offset < HEADER_LEN as u64 || end > data.len() as u64 {
            return Err(invalid(format!(
                "value for key of {key_len} bytes lies outside the store"
            )));
        }
        index.insert(key, (value_offset, value_len));
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_file_is_invalid() {
        let err = parse_index(b"CPK1", Path::new("t")).unwrap_err();
        assert!(matches!(err, CorpusDatasetError::InvalidStore { .. }));
    }

    #[test]
    fn bad_magic_is_invalid() {
        let data = vec![0u8; HEADER_LEN];
        let err = parse_index(&data, Path::new("t")).unwrap_err();
        assert!(matches!(err, CorpusDatasetError::InvalidStore { .. }));
    }

    #[test]
    fn value_outside_mapping_is_invalid() {
        // Header claiming one entry whose value extends past the file end.
        let mut data = Vec::new();
        data.extend_from_slice(STORE_MAGIC);
        data.extend_from_slice(&STORE_VERSION.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&(HEADER_LEN as u64).to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes()); // key_len
        data.push(b'k');
        data.extend_from_slice(&(HEADER_LEN as u64).to_le_bytes()); // value offset
        data.extend_from_slice(&1024u64.to_le_bytes()); // value len, past EOF
        let err = parse_index(&data, Path::new("t")).unwrap_err();
        assert!(matches!(err, CorpusDatasetError::InvalidStore { .. }));
    }
}
