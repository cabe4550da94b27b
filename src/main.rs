use anyhow::{Context, Result};
use bert_extractor::storage::store_name;
use bert_extractor::{Extractor, FileTensorStore, OutputFormat, RunConfig, TensorStore};
use clap::Parser;
use std::path::PathBuf;

/// Extracts a dataset and stores it as BERT-ready tensors.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "./config/config_sample_reviews.json")]
    config_path: PathBuf,

    /// Directory the tensor is written to
    #[arg(long, default_value = "./data/")]
    output_path: PathBuf,

    /// Encoding of the stored tensor
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bert_extractor=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = RunConfig::from_file(&cli.config_path)?;
    let locator = config.locator();

    let mut extractor = Extractor::from_config(&config)?;
    let tensor = extractor
        .extract_preprocess(&locator)
        .with_context(|| format!("extracting {} from {}", config.extractor_type, locator))?;

    let name = store_name(config.extractor_type.as_ref(), &locator);
    FileTensorStore::new(cli.output_format).store(&tensor, &cli.output_path, &name)?;
    Ok(())
}
