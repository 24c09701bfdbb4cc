use crate::cli::InspectArgs;
use crate::error::Result;
use tracing::info;
use voxchem::core::io::storage::{ManifestRow, StoredDataset};
use voxchem::engine::config::FeedConfig;
use voxchem::engine::feed::DataFeed;

/// Label statistics of a stored dataset, in Hartree.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl LabelSummary {
    pub fn from_rows(rows: &[ManifestRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let (min, max, sum) = rows.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), row| (min.min(row.label), max.max(row.label), sum + row.label),
        );
        Some(Self {
            count: rows.len(),
            min,
            max,
            mean: sum / rows.len() as f64,
        })
    }
}

pub fn run(args: InspectArgs) -> Result<()> {
    info!("Opening dataset at {:?}", &args.dataset);
    let stored = StoredDataset::open(&args.dataset)?;

    println!("Dataset: {}", args.dataset.display());
    match LabelSummary::from_rows(stored.rows()) {
        Some(summary) => println!(
            "  {} sample(s), label min {:.6} / max {:.6} / mean {:.6} Ha",
            summary.count, summary.min, summary.max, summary.mean
        ),
        None => println!("  empty dataset"),
    }

    println!("  {:>10} {:>14} {:>14} {:>6}", "id", "label", "raw_energy", "atoms");
    for row in stored.rows().iter().take(args.limit) {
        println!(
            "  {:>10} {:>14.6} {:>14.6} {:>6}",
            row.id, row.label, row.raw_energy, row.atom_count
        );
    }

    let mut feed_config = FeedConfig::new(args.batch_size).with_shuffle(args.shuffle);
    if let Some(seed) = args.seed {
        feed_config = feed_config.with_seed(seed);
    }
    let mut feed = DataFeed::new(stored, feed_config)?;
    feed.next_epoch();

    println!(
        "  {} full batch(es) of {} per epoch",
        feed.epoch_length(),
        feed.batch_size()
    );
    if feed.epoch_length() > 0 {
        let batch = feed.get_batch(0)?;
        println!(
            "  first batch: grids {:?}, labels {:?}, ids {:?}",
            batch.grids.shape(),
            batch.labels.shape(),
            batch.ids
        );
    }
    Ok(())
}
