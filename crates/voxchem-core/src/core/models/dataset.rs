use crate::core::energy::EnergyBreakdown;
use crate::core::grid::PotentialGrid;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("A sample with id {0} is already part of the dataset")]
pub struct DuplicateSampleId(pub u64);

/// One rasterized molecule with its atomization-energy label (Hartree).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    id: u64,
    grid: PotentialGrid,
    label: f64,
}

impl Sample {
    pub fn new(id: u64, grid: PotentialGrid, label: f64) -> Self {
        Self { id, grid, label }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn grid(&self) -> &PotentialGrid {
        &self.grid
    }

    pub fn label(&self) -> f64 {
        self.label
    }
}

/// Append-only collection used while a dataset is being built.
///
/// Only [`DatasetBuilder::freeze`] turns it into a [`Dataset`]; once frozen no
/// sample can be added, removed or changed.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    samples: Vec<Sample>,
    diagnostics: Vec<EnergyBreakdown>,
    index: HashMap<u64, usize>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            diagnostics: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Appends a sample together with its energy diagnostics.
    ///
    /// # Errors
    ///
    /// Rejects a sample whose id is already present; the builder is left unchanged.
    pub fn push(
        &mut self,
        sample: Sample,
        diagnostics: EnergyBreakdown,
    ) -> Result<(), DuplicateSampleId> {
        if self.index.contains_key(&sample.id) {
            return Err(DuplicateSampleId(sample.id));
        }
        self.index.insert(sample.id, self.samples.len());
        self.samples.push(sample);
        self.diagnostics.push(diagnostics);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn freeze(self) -> Dataset {
        Dataset {
            samples: self.samples,
            diagnostics: self.diagnostics,
            index: self.index,
        }
    }
}

/// A finished, read-only dataset.
///
/// Samples keep their insertion order; `diagnostics()[i]` always describes
/// `samples()[i]`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
    diagnostics: Vec<EnergyBreakdown>,
    index: HashMap<u64, usize>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Looks up a sample by its record id.
    pub fn get(&self, id: u64) -> Option<&Sample> {
        self.index.get(&id).map(|&i| &self.samples[i])
    }

    /// Position of the sample with `id` in dataset order.
    pub fn position(&self, id: u64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn diagnostics(&self) -> &[EnergyBreakdown] {
        &self.diagnostics
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().map(|s| s.id)
    }

    pub fn labels(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.label)
    }
}
