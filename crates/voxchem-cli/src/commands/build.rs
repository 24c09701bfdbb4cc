use crate::cli::BuildArgs;
use crate::config::PartialBuildConfig;
use crate::error::{CliError, Result};
use crate::utils::parser;
use crate::utils::progress::CliProgressHandler;
use tracing::{info, warn};
use voxchem::{
    core::io::storage::write_dataset,
    engine::progress::ProgressReporter,
    workflows::{
        self,
        build::{BuildReport, RecordSource, discover_sources},
    },
};

pub fn run(args: BuildArgs, threads: Option<usize>) -> Result<BuildReport> {
    let partial_config = match &args.config {
        Some(path) => PartialBuildConfig::from_file(path)?,
        None => PartialBuildConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args, threads)?;

    let sources = collect_sources(&args)?;
    if sources.is_empty() {
        return Err(CliError::Argument(
            "No geometry records found in the given inputs.".to_string(),
        ));
    }
    info!(
        "Building {} record(s) on {} worker(s).",
        sources.len(),
        config.workers
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Rasterizing {} record(s)...", sources.len());
    let report = workflows::build::run(&sources, &config, &reporter, None)?;

    for skipped in &report.skipped {
        warn!("Skipped {}: {}", skipped.source, skipped.error);
    }

    if report.dataset.is_empty() {
        warn!("Build finished without a single valid record; nothing written.");
        println!("Warning: no record could be built.");
        return Ok(report);
    }

    info!("Writing dataset to {:?}", &args.output);
    write_dataset(&report.dataset, &args.output)?;
    println!(
        "✓ {} sample(s) written to {} ({} skipped).",
        report.dataset.len(),
        args.output.display(),
        report.skipped.len()
    );
    Ok(report)
}

fn collect_sources(args: &BuildArgs) -> Result<Vec<RecordSource>> {
    if let Some(ids) = &args.ids {
        let [dir] = args.input.as_slice() else {
            return Err(CliError::Argument(
                "--ids needs exactly one input directory.".to_string(),
            ));
        };
        if !dir.is_dir() {
            return Err(CliError::Argument(format!(
                "--ids needs a directory, got {}",
                dir.display()
            )));
        }
        let ids = parser::parse_id_ranges(ids).map_err(|e| CliError::Argument(e.to_string()))?;
        return Ok(ids.into_iter().map(|id| RecordSource::qm9(dir, id)).collect());
    }

    let mut sources = Vec::new();
    for input in &args.input {
        if input.is_dir() {
            sources.extend(discover_sources(input)?);
        } else {
            sources.push(RecordSource::path(input));
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;
    use voxchem::core::io::storage::{StoredDataset, grid_path};

    fn write_record(dir: &Path, id: u64) {
        let text = format!(
            "3\ngdb {id} 1.0 1.0 1.0 0.0 1.0 -0.1 0.1 0.2 10.0 0.01 -76.4 -1.0 -1.0 -1.0 1.0\n\
             O 0.0 0.0 0.1\nH 0.76 0.0 -0.5\nH -0.76 0.0 -0.5\n"
        );
        fs::write(dir.join(format!("dsgdb9nsd_{id:06}.xyz")), text).unwrap();
    }

    fn build_args(args: &[&str]) -> (BuildArgs, Option<usize>) {
        let mut full = vec!["voxchem"];
        full.extend_from_slice(args);
        let cli = Cli::parse_from(full);
        match cli.command {
            Commands::Build(build) => (build, cli.threads),
            _ => panic!("Expected 'build' subcommand"),
        }
    }

    #[test]
    fn builds_a_directory_into_a_stored_dataset() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        for id in [1, 2, 3] {
            write_record(input.path(), id);
        }
        fs::write(input.path().join("dsgdb9nsd_000004.xyz"), "broken").unwrap();

        let (args, threads) = build_args(&[
            "-j",
            "2",
            "build",
            "-i",
            input.path().to_str().unwrap(),
            "-o",
            output.path().to_str().unwrap(),
            "-n",
            "8",
        ]);
        let report = run(args, threads).unwrap();
        assert_eq!(report.dataset.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(report.skipped.len(), 1);

        let stored = StoredDataset::open(output.path()).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.load_grid(2).unwrap().shape(), &[8, 8, 8]);
    }

    #[test]
    fn id_ranges_resolve_qm9_file_names() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        for id in [5, 6, 9] {
            write_record(input.path(), id);
        }

        let (args, threads) = build_args(&[
            "build",
            "-i",
            input.path().to_str().unwrap(),
            "-o",
            output.path().to_str().unwrap(),
            "--ids",
            "5-7",
            "-n",
            "4",
        ]);
        let report = run(args, threads).unwrap();
        assert_eq!(report.dataset.ids().collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(report.skipped.len(), 1);
        assert!(!grid_path(output.path(), 9).exists());
    }

    #[test]
    fn ids_with_several_inputs_is_an_argument_error() {
        let (args, threads) = build_args(&["build", "-i", "a", "b", "-o", "out", "--ids", "1"]);
        assert!(matches!(run(args, threads), Err(CliError::Argument(_))));
    }

    #[test]
    fn empty_input_directory_is_an_argument_error() {
        let input = tempdir().unwrap();
        let (args, threads) = build_args(&[
            "build",
            "-i",
            input.path().to_str().unwrap(),
            "-o",
            "out",
        ]);
        assert!(matches!(run(args, threads), Err(CliError::Argument(_))));
    }
}
