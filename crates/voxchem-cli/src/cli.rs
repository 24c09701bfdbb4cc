use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use voxchem::core::grid::rasterizer::ChannelMode;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "VoxChem CLI - Builds voxelized Gaussian potential datasets labeled with atomization energies from QM9-style XYZ records.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rasterize geometry records into a labeled dataset directory.
    Build(BuildArgs),
    /// Summarize a dataset directory and load its first batch.
    Inspect(InspectArgs),
}

/// Grid layout selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// One grid summed over all atoms.
    Single,
    /// One channel per element (H, C, N, O, F).
    PerElement,
}

impl From<ModeArg> for ChannelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => ChannelMode::Single,
            ModeArg::PerElement => ChannelMode::PerElement,
        }
    }
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    // --- Core Arguments ---
    /// XYZ files or directories of XYZ files to build from.
    #[arg(short, long, required = true, num_args(1..), value_name = "PATH")]
    pub input: Vec<PathBuf>,

    /// Output directory for the `.npy` grids and `manifest.csv`.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Build only these QM9 ids (e.g. '1-100,250'), resolved as
    /// `dsgdb9nsd_XXXXXX.xyz` inside the single input directory.
    #[arg(long, value_name = "RANGES")]
    pub ids: Option<String>,

    // --- Raster Overrides ---
    /// Override the grid layout.
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the Gaussian width in Å.
    #[arg(long, value_name = "FLOAT")]
    pub gamma: Option<f64>,

    /// Override the per-element peak height.
    #[arg(long, value_name = "FLOAT")]
    pub alpha: Option<f64>,

    /// Override the number of voxels per axis.
    #[arg(short = 'n', long, value_name = "INT")]
    pub n_points: Option<usize>,

    /// Override the edge length of the sampled cube in Å.
    #[arg(long, value_name = "FLOAT")]
    pub physic_length: Option<f64>,

    // --- Build Overrides ---
    /// TOML file with per-element reference energies.
    #[arg(long, value_name = "PATH")]
    pub energy_table: Option<PathBuf>,

    /// Skip any record that takes longer than this to rasterize.
    #[arg(long, value_name = "MS")]
    pub record_timeout_ms: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S raster.gamma=0.4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Dataset directory written by `build`.
    #[arg(required = true, value_name = "DIR")]
    pub dataset: PathBuf,

    /// Batch size used to check the epoch layout.
    #[arg(short, long, default_value_t = 32, value_name = "INT")]
    pub batch_size: usize,

    /// Shuffle the epoch before loading the first batch.
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for the shuffle.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Number of manifest rows to print.
    #[arg(long, default_value_t = 10, value_name = "INT")]
    pub limit: usize,
}
