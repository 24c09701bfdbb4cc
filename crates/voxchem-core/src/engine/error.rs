use thiserror::Error;

use super::config::ConfigError;
use crate::core::energy::EnergyError;
use crate::core::grid::rasterizer::RasterError;
use crate::core::io::storage::StorageError;
use crate::core::io::xyz::XyzError;

/// Failures that abort a whole build.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to start the worker pool: {0}")]
    ThreadPool(String),
}

/// Why a single record was left out of a dataset.
///
/// These never abort a build; the builder turns each one into a skipped record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to parse record: {0}")]
    Parse(#[from] XyzError),

    #[error("Failed to compute energy label: {0}")]
    Energy(#[from] EnergyError),

    #[error("Failed to rasterize record: {0}")]
    Raster(#[from] RasterError),

    #[error("Record id {0} was already added by an earlier source")]
    DuplicateId(u64),
}

/// Failures while serving batches. Each one only affects the call that returned it.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch index {index} is out of range for an epoch of {len} batches")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Sample at position {0} is missing from the store")]
    MissingSample(usize),

    #[error("Samples in one batch have different grid shapes: {expected:?} vs {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Failed to load sample: {0}")]
    Storage(#[from] StorageError),
}
