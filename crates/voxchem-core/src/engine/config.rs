use crate::core::energy::ReferenceEnergyTable;
use crate::core::grid::GridGeometry;
use crate::core::grid::rasterizer::{ChannelMode, GaussianRasterizer, OffsetScope, Weighting};
use crate::core::models::atom::Element;
use std::time::Duration;
use thiserror::Error;

/// Gaussian width in Å.
pub const DEFAULT_GAMMA: f64 = 0.36;
/// Peak height of every atom in per-element grids.
pub const DEFAULT_ALPHA: f64 = 6.0;
pub const DEFAULT_N_POINTS: usize = 32;
/// Upper bound on voxels per axis; keeps `5 · n³` voxel counts far from overflow.
pub const MAX_N_POINTS: usize = 1024;
/// Edge length of the sampled cube in Å.
pub const DEFAULT_PHYSIC_LENGTH: f64 = 12.0;
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterConfig {
    pub gamma: f64,
    pub alpha: f64,
    pub n_points: usize,
    pub physic_length: f64,
    pub mode: ChannelMode,
    /// Overrides the weighting implied by `mode`.
    pub weighting: Option<Weighting>,
    pub offset_scope: OffsetScope,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            alpha: DEFAULT_ALPHA,
            n_points: DEFAULT_N_POINTS,
            physic_length: DEFAULT_PHYSIC_LENGTH,
            mode: ChannelMode::Single,
            weighting: None,
            offset_scope: OffsetScope::Molecule,
        }
    }
}

impl RasterConfig {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.n_points, self.physic_length)
    }

    pub fn rasterizer(&self) -> GaussianRasterizer {
        GaussianRasterizer::new(self.geometry(), self.gamma, self.alpha)
            .with_offset_scope(self.offset_scope)
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
            .unwrap_or_else(|| self.rasterizer().default_weighting(self.mode))
    }

    /// Shape of every grid produced with this configuration.
    pub fn grid_shape(&self) -> Vec<usize> {
        let n = self.n_points;
        match self.mode {
            ChannelMode::Single => vec![n, n, n],
            ChannelMode::PerElement => vec![Element::COUNT, n, n, n],
        }
    }
}

#[derive(Default)]
pub struct RasterConfigBuilder {
    gamma: Option<f64>,
    alpha: Option<f64>,
    n_points: Option<usize>,
    physic_length: Option<f64>,
    mode: Option<ChannelMode>,
    weighting: Option<Weighting>,
    offset_scope: Option<OffsetScope>,
}

impl RasterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn n_points(mut self, n: usize) -> Self {
        self.n_points = Some(n);
        self
    }
    pub fn physic_length(mut self, length: f64) -> Self {
        self.physic_length = Some(length);
        self
    }
    pub fn mode(mut self, mode: ChannelMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = Some(weighting);
        self
    }
    pub fn offset_scope(mut self, scope: OffsetScope) -> Self {
        self.offset_scope = Some(scope);
        self
    }

    /// Fills unset values with the defaults and validates the result.
    pub fn build(self) -> Result<RasterConfig, ConfigError> {
        let defaults = RasterConfig::default();
        let config = RasterConfig {
            gamma: self.gamma.unwrap_or(defaults.gamma),
            alpha: self.alpha.unwrap_or(defaults.alpha),
            n_points: self.n_points.unwrap_or(defaults.n_points),
            physic_length: self.physic_length.unwrap_or(defaults.physic_length),
            mode: self.mode.unwrap_or(defaults.mode),
            weighting: self.weighting,
            offset_scope: self.offset_scope.unwrap_or(defaults.offset_scope),
        };

        if !(config.gamma.is_finite() && config.gamma > 0.0) {
            return Err(invalid("gamma", format!("must be positive, got {}", config.gamma)));
        }
        if !config.alpha.is_finite() {
            return Err(invalid("alpha", format!("must be finite, got {}", config.alpha)));
        }
        if !(1..=MAX_N_POINTS).contains(&config.n_points) {
            return Err(invalid(
                "n_points",
                format!("must be between 1 and {MAX_N_POINTS}, got {}", config.n_points),
            ));
        }
        if !(config.physic_length.is_finite() && config.physic_length > 0.0) {
            return Err(invalid(
                "physic_length",
                format!("must be positive, got {}", config.physic_length),
            ));
        }
        if let Some(Weighting::Constant(w)) = config.weighting {
            if !w.is_finite() {
                return Err(invalid("weighting", format!("constant must be finite, got {w}")));
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Worker threads in the build pool.
    pub workers: usize,
    pub raster: RasterConfig,
    /// Wall-clock budget for rasterizing one record.
    pub record_timeout: Option<Duration>,
    pub energy_table: ReferenceEnergyTable,
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    workers: Option<usize>,
    raster: Option<RasterConfig>,
    record_timeout: Option<Duration>,
    energy_table: Option<ReferenceEnergyTable>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn raster(mut self, raster: RasterConfig) -> Self {
        self.raster = Some(raster);
        self
    }
    pub fn record_timeout(mut self, timeout: Duration) -> Self {
        self.record_timeout = Some(timeout);
        self
    }
    pub fn energy_table(mut self, table: ReferenceEnergyTable) -> Self {
        self.energy_table = Some(table);
        self
    }

    /// Missing workers default to the number of available cores.
    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let workers = match self.workers {
            Some(0) => return Err(invalid("workers", "must be at least 1")),
            Some(n) => n,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };
        if self.record_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("record_timeout", "must be greater than zero"));
        }
        Ok(BuildConfig {
            workers,
            raster: self.raster.unwrap_or_default(),
            record_timeout: self.record_timeout,
            energy_table: self.energy_table.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Seed for the shuffle RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            shuffle: true,
            seed: None,
        }
    }
}

impl FeedConfig {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        Ok(())
    }
}
