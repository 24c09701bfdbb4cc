//! Epoch-based batch access over a finished dataset.
//!
//! A [`DataFeed`] keeps a permutation of sample positions for the current epoch
//! and materializes one batch at a time, loading only the samples that batch
//! needs. Incomplete trailing batches are dropped.

use super::config::FeedConfig;
use super::error::FeedError;
use crate::core::grid::PotentialGrid;
use crate::core::io::storage::{StoredDataset, grid_path};
use crate::core::models::dataset::Dataset;
use ndarray::{Array1, ArrayD, Axis, IxDyn};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::borrow::Cow;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One sample as handed out by a [`SampleStore`].
#[derive(Debug, Clone)]
pub struct StoredSample<'a> {
    pub id: u64,
    pub grid: Cow<'a, PotentialGrid>,
    pub label: f64,
}

/// Random access to the samples of a dataset by position.
pub trait SampleStore: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads the sample at `position` in dataset order.
    fn load(&self, position: usize) -> Result<StoredSample<'_>, FeedError>;
}

impl SampleStore for Dataset {
    fn len(&self) -> usize {
        Dataset::len(self)
    }

    fn load(&self, position: usize) -> Result<StoredSample<'_>, FeedError> {
        let sample = self
            .sample(position)
            .ok_or(FeedError::MissingSample(position))?;
        Ok(StoredSample {
            id: sample.id(),
            grid: Cow::Borrowed(sample.grid()),
            label: sample.label(),
        })
    }
}

impl SampleStore for StoredDataset {
    fn len(&self) -> usize {
        StoredDataset::len(self)
    }

    fn load(&self, position: usize) -> Result<StoredSample<'_>, FeedError> {
        let row = self
            .rows()
            .get(position)
            .ok_or(FeedError::MissingSample(position))?;
        if !grid_path(self.dir(), row.id).is_file() {
            return Err(FeedError::MissingSample(position));
        }
        Ok(StoredSample {
            id: row.id,
            grid: Cow::Owned(self.load_grid(row.id)?),
            label: row.label,
        })
    }
}

/// A stacked batch: grids `[B, n, n, n]` or `[B, C, n, n, n]`, labels `[B]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub ids: Vec<u64>,
    pub grids: ArrayD<f32>,
    pub labels: Array1<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct DataFeed<S: SampleStore> {
    store: S,
    config: FeedConfig,
    rng: ChaCha8Rng,
    order: Vec<usize>,
}

impl<S: SampleStore> DataFeed<S> {
    /// Creates a feed whose first epoch walks the store in dataset order.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] when `batch_size` is zero.
    pub fn new(store: S, config: FeedConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let order = (0..store.len()).collect();
        Ok(Self {
            store,
            config,
            rng,
            order,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Number of full batches per epoch.
    pub fn epoch_length(&self) -> usize {
        self.store.len() / self.config.batch_size
    }

    /// The sample positions of the current epoch, in serving order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Resets the epoch order: a fresh permutation when `shuffle` is set,
    /// dataset order otherwise.
    pub fn on_epoch_start(&mut self, shuffle: bool) {
        self.order.clear();
        self.order.extend(0..self.store.len());
        if shuffle {
            self.order.shuffle(&mut self.rng);
        }
        debug!(samples = self.order.len(), shuffle, "Started new epoch.");
    }

    /// Starts an epoch using the configured shuffle setting.
    pub fn next_epoch(&mut self) {
        self.on_epoch_start(self.config.shuffle);
    }

    /// Loads and stacks batch `index` of the current epoch.
    pub fn get_batch(&self, index: usize) -> Result<Batch, FeedError> {
        let len = self.epoch_length();
        if index >= len {
            return Err(FeedError::IndexOutOfRange { index, len });
        }
        let size = self.config.batch_size;
        let positions = &self.order[index * size..(index + 1) * size];

        #[cfg(not(feature = "parallel"))]
        let samples = positions
            .iter()
            .map(|&p| self.store.load(p))
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(feature = "parallel")]
        let samples = positions
            .par_iter()
            .map(|&p| self.store.load(p))
            .collect::<Result<Vec<_>, _>>()?;

        stack(samples)
    }

    /// Iterates over every batch of the current epoch.
    pub fn batches(&self) -> impl Iterator<Item = Result<Batch, FeedError>> + '_ {
        (0..self.epoch_length()).map(move |b| self.get_batch(b))
    }
}

fn stack(samples: Vec<StoredSample<'_>>) -> Result<Batch, FeedError> {
    let Some(first) = samples.first() else {
        return Err(FeedError::MissingSample(0));
    };
    let sample_shape = first.grid.shape().to_vec();
    if let Some(other) = samples.iter().find(|s| s.grid.shape() != sample_shape.as_slice()) {
        return Err(FeedError::ShapeMismatch {
            expected: sample_shape,
            found: other.grid.shape().to_vec(),
        });
    }

    let mut batch_shape = Vec::with_capacity(sample_shape.len() + 1);
    batch_shape.push(samples.len());
    batch_shape.extend_from_slice(&sample_shape);

    let mut grids = ArrayD::<f32>::zeros(IxDyn(&batch_shape));
    for (mut slot, sample) in grids.axis_iter_mut(Axis(0)).zip(&samples) {
        slot.assign(&sample.grid.view());
    }

    Ok(Batch {
        ids: samples.iter().map(|s| s.id).collect(),
        labels: samples.iter().map(|s| s.label as f32).collect(),
        grids,
    })
}
