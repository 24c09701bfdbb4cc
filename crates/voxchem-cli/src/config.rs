use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use voxchem::core::energy::ReferenceEnergyTable;
use voxchem::core::grid::rasterizer::{ChannelMode, OffsetScope, Weighting};
use voxchem::engine::config as core_config;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialMode {
    Single,
    PerElement,
}

impl From<PartialMode> for ChannelMode {
    fn from(p: PartialMode) -> Self {
        match p {
            PartialMode::Single => ChannelMode::Single,
            PartialMode::PerElement => ChannelMode::PerElement,
        }
    }
}

/// Which peak height every atom gets, independent of the grid layout.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialWeighting {
    AtomicNumber,
    Alpha,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialOffsetScope {
    Molecule,
    Element,
}

impl From<PartialOffsetScope> for OffsetScope {
    fn from(p: PartialOffsetScope) -> Self {
        match p {
            PartialOffsetScope::Molecule => OffsetScope::Molecule,
            PartialOffsetScope::Element => OffsetScope::ElementGroup,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialRasterConfig {
    gamma: Option<f64>,
    alpha: Option<f64>,
    #[serde(rename = "n-points")]
    n_points: Option<usize>,
    #[serde(rename = "physic-length")]
    physic_length: Option<f64>,
    mode: Option<PartialMode>,
    weighting: Option<PartialWeighting>,
    #[serde(rename = "offset-scope")]
    offset_scope: Option<PartialOffsetScope>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialBuildConfig {
    workers: Option<usize>,
    #[serde(rename = "record-timeout-ms")]
    record_timeout_ms: Option<u64>,
    #[serde(rename = "energy-table")]
    energy_table: Option<PathBuf>,
    raster: Option<PartialRasterConfig>,
}

impl PartialBuildConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final build configuration.
    ///
    /// Precedence, highest first: `--set` values, dedicated CLI flags, the
    /// config file, library defaults. `threads` is the global `-j` option.
    pub fn merge_with_cli(
        mut self,
        args: &BuildArgs,
        threads: Option<usize>,
    ) -> Result<core_config::BuildConfig> {
        let mut set_overrides = Self::parse_set_values(&args.set_values)?;
        let set_raster = set_overrides.raster.take().unwrap_or_default();
        let raster_file = self.raster.take().unwrap_or_default();

        let mut raster = core_config::RasterConfigBuilder::new();
        if let Some(gamma) = set_raster.gamma.or(args.gamma).or(raster_file.gamma) {
            raster = raster.gamma(gamma);
        }
        if let Some(alpha) = set_raster.alpha.or(args.alpha).or(raster_file.alpha) {
            raster = raster.alpha(alpha);
        }
        if let Some(n) = set_raster
            .n_points
            .or(args.n_points)
            .or(raster_file.n_points)
        {
            raster = raster.n_points(n);
        }
        if let Some(length) = set_raster
            .physic_length
            .or(args.physic_length)
            .or(raster_file.physic_length)
        {
            raster = raster.physic_length(length);
        }
        let mode: Option<ChannelMode> = set_raster
            .mode
            .map(Into::into)
            .or(args.mode.map(Into::into))
            .or(raster_file.mode.map(Into::into));
        if let Some(mode) = mode {
            raster = raster.mode(mode);
        }
        if let Some(scope) = set_raster.offset_scope.or(raster_file.offset_scope) {
            raster = raster.offset_scope(scope.into());
        }
        let raster = raster
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;
        let raster = match set_raster.weighting.or(raster_file.weighting) {
            Some(PartialWeighting::AtomicNumber) => core_config::RasterConfig {
                weighting: Some(Weighting::AtomicNumber),
                ..raster
            },
            Some(PartialWeighting::Alpha) => core_config::RasterConfig {
                weighting: Some(Weighting::Constant(raster.alpha)),
                ..raster
            },
            None => raster,
        };

        let mut builder = core_config::BuildConfigBuilder::new().raster(raster);
        if let Some(workers) = set_overrides.workers.or(threads).or(self.workers) {
            builder = builder.workers(workers);
        }
        if let Some(ms) = set_overrides
            .record_timeout_ms
            .or(args.record_timeout_ms)
            .or(self.record_timeout_ms)
        {
            builder = builder.record_timeout(Duration::from_millis(ms));
        }
        if let Some(path) = args.energy_table.as_ref().or(self.energy_table.as_ref()) {
            let table = ReferenceEnergyTable::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            builder = builder.energy_table(table);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn parse_set_values(set_values: &[String]) -> Result<PartialBuildConfig> {
        let mut overrides = PartialBuildConfig::default();
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let invalid = |kind: &str| {
                CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
            };
            let raster = overrides.raster.get_or_insert_with(Default::default);

            match key {
                "workers" => {
                    overrides.workers = Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                "record-timeout-ms" => {
                    overrides.record_timeout_ms =
                        Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                "raster.gamma" => {
                    raster.gamma = Some(value_str.parse().map_err(|_| invalid("float"))?);
                }
                "raster.alpha" => {
                    raster.alpha = Some(value_str.parse().map_err(|_| invalid("float"))?);
                }
                "raster.n-points" => {
                    raster.n_points = Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                "raster.physic-length" => {
                    raster.physic_length = Some(value_str.parse().map_err(|_| invalid("float"))?);
                }
                "raster.mode" => {
                    raster.mode = Some(match value_str {
                        "single" => PartialMode::Single,
                        "per-element" => PartialMode::PerElement,
                        _ => return Err(invalid("mode")),
                    });
                }
                "raster.offset-scope" => {
                    raster.offset_scope = Some(match value_str {
                        "molecule" => PartialOffsetScope::Molecule,
                        "element" => PartialOffsetScope::Element,
                        _ => return Err(invalid("offset scope")),
                    });
                }
                "raster.weighting" => {
                    raster.weighting = Some(match value_str {
                        "atomic-number" => PartialWeighting::AtomicNumber,
                        "alpha" => PartialWeighting::Alpha,
                        _ => return Err(invalid("weighting")),
                    });
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(overrides)
    }
}
