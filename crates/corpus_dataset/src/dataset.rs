//! The dataset object: lazy store initialization and per-index sample
//! materialization.

use crate::catalog::IndexCatalog;
use crate::codec;
use crate::store::StoreEnv;
use crate::types::{
    CorpusDatasetError, DatasetConfig, DatasetResult, LinearTransform, PairedTransform, Sample,
    TransformPolicy,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Output shape fixed once from the transform policy and label flag, so the
/// per-access path matches a closed set instead of re-testing flags.
enum SamplePlan {
    Single(LinearTransform),
    SingleLabeled(LinearTransform),
    Paired(PairedTransform),
    PairedLabeled(PairedTransform),
}

impl SamplePlan {
    fn from_config(config: &DatasetConfig) -> Self {
        match (&config.transform, config.emit_label) {
            (TransformPolicy::Linear(f), false) => SamplePlan::Single(f.clone()),
            (TransformPolicy::Linear(f), true) => SamplePlan::SingleLabeled(f.clone()),
            (TransformPolicy::Paired(f), false) => SamplePlan::Paired(f.clone()),
            (TransformPolicy::Paired(f), true) => SamplePlan::PairedLabeled(f.clone()),
        }
    }
}

struct ReadyState {
    env: StoreEnv,
    catalog: IndexCatalog,
}

/// A read-only, randomly indexable view over a packed image corpus.
///
/// Construction records configuration only; the store is opened on the
/// first accessor call, not in the constructor. A parallel loader can
/// therefore build the dataset in a parent process and fork workers before
/// any mapped file handle exists — each worker opens its own mapping on its
/// first read. Once open, the environment and catalog are immutable and the
/// dataset is safe to share across reader threads.
pub struct Dataset {
    config: DatasetConfig,
    plan: SamplePlan,
    state: RwLock<Option<Arc<ReadyState>>>,
    opens: AtomicUsize,
}

impl Dataset {
    /// Record configuration for a store at `root`. No filesystem access.
    pub fn open(root: impl Into<PathBuf>, transform: TransformPolicy, emit_label: bool) -> Self {
        Self::with_config(DatasetConfig {
            root: root.into(),
            transform,
            emit_label,
            len_hint: None,
        })
    }

    pub fn with_config(config: DatasetConfig) -> Self {
        let plan = SamplePlan::from_config(&config);
        Dataset {
            config,
            plan,
            state: RwLock::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Whether the store has been opened and the catalog populated.
    pub fn is_ready(&self) -> bool {
        self.read_state().is_some()
    }

    /// The provisional count from configuration, without touching the store.
    pub fn len_hint(&self) -> Option<usize> {
        self.config.len_hint
    }

    /// How many times the store open actually executed. Stays at one for
    /// the lifetime of a dataset whose first initialization succeeded.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Authoritative entry count. Initializes the store if needed, so this
    /// never returns a provisional value.
    pub fn len(&self) -> DatasetResult<usize> {
        Ok(self.ready()?.catalog.count())
    }

    pub fn is_empty(&self) -> DatasetResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Fetch, decode, transform, and shape the sample at `index`.
    pub fn get_item(&self, index: usize) -> DatasetResult<Sample> {
        let state = self.ready()?;
        self.materialize(&state, index)
    }

    /// Alias for [`Dataset::get_item`].
    pub fn get_sample(&self, index: usize) -> DatasetResult<Sample> {
        self.get_item(index)
    }

    fn read_state(&self) -> Option<Arc<ReadyState>> {
        let guard = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    /// One-time transition to the ready state.
    ///
    /// Double-checked under the write lock: when several threads race the
    /// first access, exactly one performs the open and the rest observe the
    /// fully populated catalog. A failed open leaves the slot empty, so a
    /// later access retries instead of pinning the dataset dead.
    fn ready(&self) -> DatasetResult<Arc<ReadyState>> {
        if let Some(state) = self.read_state() {
            return Ok(state);
        }
        let mut slot = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(state) = slot.as_ref() {
            return Ok(state.clone());
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        let env = StoreEnv::open(&self.config.root)?;
        let catalog = IndexCatalog::build(&env)?;
        let state = Arc::new(ReadyState { env, catalog });
        *slot = Some(state.clone());
        Ok(state)
    }

    fn materialize(&self, state: &ReadyState, index: usize) -> DatasetResult<Sample> {
        let catalog = &state.catalog;
        let key = catalog
            .key(index)
            .ok_or(CorpusDatasetError::IndexOutOfRange {
                index,
                len: catalog.count(),
            })?;

        let txn = state.env.begin_read();
        let raw = txn.get(key).ok_or_else(|| CorpusDatasetError::MissingRecord {
            index,
            key: String::from_utf8_lossy(key).into_owned(),
        })?;
        let record = codec::decode_record(raw)?;

        let img = image::load_from_memory(&record.image_bytes)
            .map_err(|e| CorpusDatasetError::ImageDecode { index, source: e })?
            .to_rgb8();

        static FIRST_SAMPLE: std::sync::Once = std::sync::Once::new();
        FIRST_SAMPLE.call_once(|| {
            eprintln!(
                "Debug: first sample {}x{} ({} encoded bytes, label {})",
                img.width(),
                img.height(),
                record.image_bytes.len(),
                record.label
            );
        });

        Ok(match &self.plan {
            SamplePlan::Single(f) => Sample::Single(f(img)),
            SamplePlan::SingleLabeled(f) => Sample::SingleLabeled {
                view: f(img),
                label: record.label,
            },
            SamplePlan::Paired(f) => {
                let (a, b) = f(&img);
                Sample::Paired(a, b)
            }
            SamplePlan::PairedLabeled(f) => {
                let (a, b) = f(&img);
                Sample::PairedLabeled {
                    views: (a, b),
                    label: record.label,
                }
            }
        })
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorpusDataset ({})", self.config.root.display())
    }
}
