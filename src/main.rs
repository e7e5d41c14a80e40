use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cognilyzer::model::{assemble_dataset, random_forest::RandomForestModel};
use cognilyzer::preprocess::{preprocess_partition, WINDOW_CONFIGS};
use cognilyzer::store::DataStore;
use cognilyzer::types::Partition;

/// Cognilyzer - cohort speech feature pipeline
///
/// Extracts segment-level acoustic functionals for the participant speaker
/// of diarized recordings and trains a Random Forest on the saved tables.
#[derive(Parser, Debug)]
#[command(name = "cognilyzer")]
#[command(version = "0.1.0")]
#[command(about = "Cohort speech feature extraction and classification", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract participant-turn features for both cohorts
    Preprocess {
        /// Directory containing the data/ tree
        #[arg(long, value_name = "DIR")]
        data_root: PathBuf,
    },
    /// Train and evaluate the Random Forest on persisted feature tables
    Train {
        /// Directory containing the data/ tree
        #[arg(long, value_name = "DIR")]
        data_root: PathBuf,

        /// Model config JSON ({"parameters": {...}})
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// Data-path manifest JSON
        #[arg(long, value_name = "FILE")]
        data_paths: PathBuf,

        /// Name of the feature set being consumed
        #[arg(long, value_name = "NAME", default_value = "egemaps")]
        feature_name: String,
    },
}

fn validate_data_root(data_root: &Path) -> Result<()> {
    if !data_root.is_dir() {
        anyhow::bail!("data root is not a directory: {:?}", data_root);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Preprocess { data_root } => run_preprocess(data_root),
        Command::Train {
            data_root,
            config,
            data_paths,
            feature_name,
        } => run_train(data_root, config, data_paths, feature_name),
    }
}

fn run_preprocess(data_root: PathBuf) -> Result<()> {
    validate_data_root(&data_root).context("failed to validate command-line arguments")?;
    let store = DataStore::new(&data_root);

    for partition in Partition::ALL {
        let summary = preprocess_partition(&store, partition)
            .with_context(|| format!("failed to preprocess partition {}", partition))?;
        println!(
            "Partition {}: {} processed, {} skipped",
            partition, summary.processed, summary.skipped
        );
    }

    println!("\nPreprocessing complete.");
    Ok(())
}

fn run_train(
    data_root: PathBuf,
    config: PathBuf,
    data_paths: PathBuf,
    feature_name: String,
) -> Result<()> {
    validate_data_root(&data_root).context("failed to validate command-line arguments")?;
    let store = DataStore::new(&data_root);

    let window = WINDOW_CONFIGS[0];
    println!(
        "Assembling dataset for window config {}x{}...",
        window.n_fft, window.hop_length
    );
    let splits = assemble_dataset(&store, window).context("failed to assemble dataset")?;
    anyhow::ensure!(
        !splits.train.is_empty(),
        "no labeled feature rows found under {:?}; run preprocess first",
        store.root()
    );
    println!(
        "Assembled {} training rows and {} development rows ({} features)",
        splits.train.len(),
        splits.dev.len(),
        splits.feature_columns.len()
    );

    let mut model = RandomForestModel::new(
        &config,
        &data_paths,
        feature_name,
        splits.train,
        splits.dev,
    )
    .context("failed to initialize the Random Forest model")?;
    model.run().context("failed to train the Random Forest")?;
    model.evaluate().context("failed to evaluate the Random Forest")
}
