//! On-disk layout of a built dataset.
//!
//! A dataset directory holds one `<id>.npy` file per sample (the `f32` grid,
//! shape `[n, n, n]` or `[5, n, n, n]`) and a `manifest.csv` listing every
//! sample's label and energy diagnostics in dataset order.

use crate::core::grid::{GridShapeError, PotentialGrid};
use crate::core::models::dataset::{Dataset, Sample};
use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, WriteNpyError, read_npy, write_npy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const MANIFEST_FILE: &str = "manifest.csv";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Failed to write grid '{path}': {source}")]
    WriteNpy {
        path: String,
        source: WriteNpyError,
    },
    #[error("Failed to read grid '{path}': {source}")]
    ReadNpy { path: String, source: ReadNpyError },
    #[error("Grid '{path}' has an unexpected shape: {source}")]
    Shape {
        path: String,
        source: GridShapeError,
    },
    #[error("Manifest lists sample id {0} more than once")]
    DuplicateId(u64),
}

/// One manifest line: a sample's label and the diagnostics behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub id: u64,
    pub label: f64,
    pub raw_energy: f64,
    pub per_atom_energy: f64,
    pub individual_energy_sum: f64,
    pub atom_count: usize,
}

/// Path of the grid file for sample `id` inside `dir`.
pub fn grid_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{id}.npy"))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Writes every sample grid and the manifest of `dataset` into `dir`,
/// creating the directory if needed.
#[instrument(skip_all, fields(dir = %dir.display(), samples = dataset.len()))]
pub fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|e| StorageError::Io {
        path: display(dir),
        source: e,
    })?;

    let write_grid = |sample: &Sample| -> Result<(), StorageError> {
        let path = grid_path(dir, sample.id());
        write_npy(&path, &sample.grid().view()).map_err(|e| StorageError::WriteNpy {
            path: display(&path),
            source: e,
        })
    };

    #[cfg(not(feature = "parallel"))]
    dataset.samples().iter().try_for_each(write_grid)?;

    #[cfg(feature = "parallel")]
    dataset.samples().par_iter().try_for_each(write_grid)?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let csv_error = |e: csv::Error| StorageError::Csv {
        path: display(&manifest_path),
        source: e,
    };
    let mut writer = csv::Writer::from_path(&manifest_path).map_err(csv_error)?;
    for (sample, energy) in dataset.samples().iter().zip(dataset.diagnostics()) {
        writer
            .serialize(ManifestRow {
                id: sample.id(),
                label: sample.label(),
                raw_energy: energy.raw_energy,
                per_atom_energy: energy.per_atom_energy,
                individual_energy_sum: energy.individual_energy_sum,
                atom_count: energy.atom_count,
            })
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| StorageError::Io {
        path: display(&manifest_path),
        source: e,
    })?;

    info!("Wrote {} samples and manifest.", dataset.len());
    Ok(())
}

/// A dataset directory opened for lazy, per-sample reads.
///
/// Only the manifest is read up front; grids are loaded on demand.
#[derive(Debug, Clone)]
pub struct StoredDataset {
    dir: PathBuf,
    rows: Vec<ManifestRow>,
    index: HashMap<u64, usize>,
}

impl StoredDataset {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let csv_error = |e: csv::Error| StorageError::Csv {
            path: display(&manifest_path),
            source: e,
        };
        let mut reader = csv::Reader::from_path(&manifest_path).map_err(csv_error)?;

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        for result in reader.deserialize::<ManifestRow>() {
            let row = result.map_err(csv_error)?;
            if index.insert(row.id, rows.len()).is_some() {
                return Err(StorageError::DuplicateId(row.id));
            }
            rows.push(row);
        }
        debug!(dir = %dir.display(), samples = rows.len(), "Opened stored dataset.");

        Ok(Self {
            dir: dir.to_path_buf(),
            rows,
            index,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn row(&self, id: u64) -> Option<&ManifestRow> {
        self.index.get(&id).map(|&i| &self.rows[i])
    }

    /// Reads the grid of sample `id` from disk.
    pub fn load_grid(&self, id: u64) -> Result<PotentialGrid, StorageError> {
        let path = grid_path(&self.dir, id);
        let data: ArrayD<f32> = read_npy(&path).map_err(|e| StorageError::ReadNpy {
            path: display(&path),
            source: e,
        })?;
        PotentialGrid::from_dyn(data).map_err(|e| StorageError::Shape {
            path: display(&path),
            source: e,
        })
    }
}
