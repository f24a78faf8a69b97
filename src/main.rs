use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mnist_backprop::{DataConfig, MnistData, NetworkBuilder, SgdConfig, MNIST_CLASSES, MNIST_INPUT};

/// Train a sigmoid network on MNIST with backpropagation and mini-batch SGD
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory with the uncompressed MNIST idx files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Hidden layer sizes
    #[arg(long, num_args = 0.., default_values_t = vec![30])]
    hidden: Vec<usize>,

    #[arg(long, default_value_t = 30)]
    epochs: usize,

    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    #[arg(long, default_value_t = 3.0)]
    learning_rate: f64,

    /// Seed for initialisation and shuffling; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 50_000)]
    training_size: u32,

    #[arg(long, default_value_t = 10_000)]
    validation_size: u32,

    #[arg(long, default_value_t = 10_000)]
    test_size: u32,

    /// Compute per-example gradients on all cores
    #[arg(long)]
    parallel: bool,

    /// Download the dataset into --data-dir first
    #[arg(long)]
    download: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let data = MnistData::load(&DataConfig {
        base_path: args.data_dir.clone(),
        training_len: args.training_size,
        validation_len: args.validation_size,
        test_len: args.test_size,
        download: args.download,
    })
    .with_context(|| format!("loading MNIST from {}", args.data_dir.display()))?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, "seeding generator");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut layers = vec![MNIST_INPUT];
    layers.extend(args.hidden.iter().copied());
    layers.push(MNIST_CLASSES);

    let mut net = NetworkBuilder::new()
        .set_layers(layers)
        .finalize(&mut rng)
        .context("building network")?;

    let config = SgdConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        parallel: args.parallel,
    };
    net.sgd(&data.training, &config, Some(data.test.as_slice()), &mut rng)
        .context("training")?;

    if !data.validation.is_empty() {
        println!(
            "Evaluation on validation set: {} of {}",
            net.evaluate(&data.validation)?,
            data.validation.len()
        );
    }
    println!(
        "Evaluation on test set: {} of {}",
        net.evaluate(&data.test)?,
        data.test.len()
    );

    Ok(())
}
