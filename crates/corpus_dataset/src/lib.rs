//! Read-only dataset views over packed image corpora.
//!
//! This crate provides:
//! - Memory-mapped access to a pre-built key-value image store
//! - Index-to-key resolution recovered from store metadata
//! - On-demand record decode (image bytes + label)
//! - Single- or paired-view transform application per sample

// Module declarations
pub mod catalog;
pub mod codec;
pub mod dataset;
pub mod store;
pub mod types;

// Re-export public API
pub use catalog::{IndexCatalog, KEYS_KEY, LEN_KEY};
pub use codec::{decode_count, decode_key_list, decode_record};
pub use dataset::Dataset;
pub use store::{ReadTxn, StoreEnv, STORE_FILE_NAME};
pub use types::{
    CorpusDatasetError, DatasetConfig, DatasetResult, LinearTransform, PairedTransform, RawRecord,
    Sample, TransformPolicy,
};
