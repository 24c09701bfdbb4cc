use crate::core::energy::EnergyBreakdown;
use crate::core::grid::rasterizer::{ChannelMode, GaussianRasterizer, Weighting};
use crate::core::io::traits::GeometryFile;
use crate::core::io::xyz::{XyzError, XyzFile};
use crate::core::models::dataset::{Dataset, DatasetBuilder, DuplicateSampleId, Sample};
use crate::core::models::record::GeometryRecord;
use crate::engine::config::BuildConfig;
use crate::engine::error::{EngineError, RecordError};
use crate::engine::progress::{Progress, ProgressReporter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where one raw geometry record comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Path(PathBuf),
    Inline { name: String, text: String },
}

impl RecordSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        RecordSource::Path(path.into())
    }

    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        RecordSource::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The file holding QM9 molecule `id` inside `dir` (`dsgdb9nsd_000123.xyz`).
    pub fn qm9(dir: &Path, id: u64) -> Self {
        RecordSource::Path(dir.join(format!("dsgdb9nsd_{id:06}.xyz")))
    }

    fn read(&self) -> Result<GeometryRecord, XyzError> {
        match self {
            RecordSource::Path(path) => XyzFile::read_from_path(path),
            RecordSource::Inline { text, .. } => XyzFile::read_from_str(text),
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Path(path) => write!(f, "{}", path.display()),
            RecordSource::Inline { name, .. } => f.write_str(name),
        }
    }
}

/// Lists every `.xyz` file directly inside `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<RecordSource>, EngineError> {
    let io_error = |e: std::io::Error| EngineError::Io {
        path: dir.to_string_lossy().to_string(),
        source: e,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "xyz") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(RecordSource::Path).collect())
}

/// Shared flag that stops a build from starting further records.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct SkippedRecord {
    pub source: String,
    pub error: RecordError,
}

#[derive(Debug)]
pub struct BuildReport {
    pub dataset: Dataset,
    pub skipped: Vec<SkippedRecord>,
    /// Records never started because the build was cancelled.
    pub cancelled: usize,
}

impl BuildReport {
    pub fn scheduled(&self) -> usize {
        self.dataset.len() + self.skipped.len() + self.cancelled
    }
}

enum Outcome {
    Built(Sample, EnergyBreakdown),
    Failed(RecordError),
    Cancelled,
}

struct RecordPipeline<'a> {
    config: &'a BuildConfig,
    rasterizer: GaussianRasterizer,
    mode: ChannelMode,
    weighting: Weighting,
}

impl RecordPipeline<'_> {
    fn process(&self, source: &RecordSource) -> Result<(Sample, EnergyBreakdown), RecordError> {
        let deadline = self.config.record_timeout.map(|t| Instant::now() + t);
        let record = source.read()?;
        let energy = EnergyBreakdown::compute(&record, &self.config.energy_table)?;
        let grid =
            self.rasterizer
                .rasterize_with(record.atoms(), self.mode, self.weighting, deadline)?;
        Ok((
            Sample::new(record.id(), grid, energy.atomization_energy),
            energy,
        ))
    }
}

/// Builds a dataset from `sources` on a dedicated pool of `config.workers` threads.
///
/// Every record is parsed, labeled and rasterized independently. A record that
/// fails at any step contributes nothing and is listed in
/// [`BuildReport::skipped`]; the build itself only fails when the pool cannot be
/// created. Samples keep the order of `sources` regardless of the worker count.
/// When two sources carry the same id, the first one wins.
///
/// # Arguments
///
/// * `sources` - The records to build.
/// * `config` - Rasterizer settings, worker count, optional per-record timeout and energy table.
/// * `reporter` - Receives one `RecordBuilt` or `RecordSkipped` event per finished record.
/// * `cancel` - Once cancelled, records that have not started are counted in
///   [`BuildReport::cancelled`]; records already running finish normally.
#[instrument(skip_all, name = "build_workflow", fields(records = sources.len(), workers = config.workers))]
pub fn run(
    sources: &[RecordSource],
    config: &BuildConfig,
    reporter: &ProgressReporter,
    cancel: Option<&CancellationToken>,
) -> Result<BuildReport, EngineError> {
    reporter.report(Progress::BuildStart {
        total_records: sources.len() as u64,
    });
    info!("Starting dataset build.");

    let pipeline = RecordPipeline {
        config,
        rasterizer: config.raster.rasterizer(),
        mode: config.raster.mode,
        weighting: config.raster.weighting(),
    };

    let run_one = |source: &RecordSource| -> Outcome {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Outcome::Cancelled;
        }
        match pipeline.process(source) {
            Ok((sample, energy)) => {
                reporter.report(Progress::RecordBuilt { id: sample.id() });
                Outcome::Built(sample, energy)
            }
            Err(error) => {
                debug!(source = %source, %error, "Record skipped.");
                reporter.report(Progress::RecordSkipped {
                    source: source.to_string(),
                    reason: error.to_string(),
                });
                Outcome::Failed(error)
            }
        }
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Outcome> = sources.iter().map(run_one).collect();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Outcome> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("voxchem-build-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
        pool.install(|| sources.par_iter().map(run_one).collect())
    };

    let report = merge(sources, outcomes, reporter);

    info!(
        built = report.dataset.len(),
        skipped = report.skipped.len(),
        cancelled = report.cancelled,
        "Dataset build finished."
    );
    reporter.report(Progress::BuildFinish {
        built: report.dataset.len(),
        skipped: report.skipped.len(),
    });
    Ok(report)
}

fn merge(sources: &[RecordSource], outcomes: Vec<Outcome>, reporter: &ProgressReporter) -> BuildReport {
    let mut builder = DatasetBuilder::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    let mut cancelled = 0;

    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Outcome::Built(sample, energy) => {
                if let Err(DuplicateSampleId(id)) = builder.push(sample, energy) {
                    warn!(source = %source, id, "Dropping record with an id that is already in the dataset.");
                    reporter.report(Progress::Message(format!(
                        "Dropped duplicate record id {id} from {source}"
                    )));
                    skipped.push(SkippedRecord {
                        source: source.to_string(),
                        error: RecordError::DuplicateId(id),
                    });
                }
            }
            Outcome::Failed(error) => skipped.push(SkippedRecord {
                source: source.to_string(),
                error,
            }),
            Outcome::Cancelled => cancelled += 1,
        }
    }

    BuildReport {
        dataset: builder.freeze(),
        skipped,
        cancelled,
    }
}
