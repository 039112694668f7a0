//! Core types, error definitions, and data structures for corpus_dataset.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, CorpusDatasetError>;

#[derive(Debug, Error)]
pub enum CorpusDatasetError {
    #[error("cannot open store at {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a valid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },
    #[error("cannot decode {what}: {source}")]
    Deserialize {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },
    #[error("store metadata entry {key} is missing")]
    MissingMetadata { key: &'static str },
    #[error("key list has {keys} entries but the store reports {count}")]
    CatalogIntegrity { count: usize, keys: usize },
    #[error("image decode failed at index {index}: {source}")]
    ImageDecode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("record for key {key} (index {index}) is missing from the store")]
    MissingRecord { index: usize, key: String },
}

/// One stored data entry, decoded: the still-encoded image plus its label.
///
/// Produced fresh on every access; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub image_bytes: Vec<u8>,
    pub label: i64,
}

/// Transform producing one view from a decoded image.
pub type LinearTransform = Arc<dyn Fn(RgbImage) -> RgbImage + Send + Sync>;

/// Transform producing two independently derived views of one source image.
pub type PairedTransform = Arc<dyn Fn(&RgbImage) -> (RgbImage, RgbImage) + Send + Sync>;

/// Caller-supplied transform applied to every decoded image.
#[derive(Clone)]
pub enum TransformPolicy {
    Linear(LinearTransform),
    Paired(PairedTransform),
}

impl fmt::Debug for TransformPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformPolicy::Linear(_) => f.write_str("TransformPolicy::Linear"),
            TransformPolicy::Paired(_) => f.write_str("TransformPolicy::Paired"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Store path: a directory holding `corpus.pack`, or the file itself.
    pub root: PathBuf,
    pub transform: TransformPolicy,
    /// Return `(view(s), label)` instead of the view(s) alone.
    pub emit_label: bool,
    /// Provisional count, readable before the store is opened.
    pub len_hint: Option<usize>,
}

/// The user-facing output of one index access.
///
/// The variant is fixed at construction time from the transform policy and
/// the label flag; a given dataset always yields the same variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Single(RgbImage),
    SingleLabeled { view: RgbImage, label: i64 },
    Paired(RgbImage, RgbImage),
    PairedLabeled { views: (RgbImage, RgbImage), label: i64 },
}

impl Sample {
    pub fn label(&self) -> Option<i64> {
        match self {
            Sample::Single(_) | Sample::Paired(..) => None,
            Sample::SingleLabeled { label, .. } | Sample::PairedLabeled { label, .. } => {
                Some(*label)
            }
        }
    }
}
