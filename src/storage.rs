//! Persistence of the final tokenized tensor.

use crate::data_processing::TokenizedTensor;
use crate::error::{ExtractorError, Result};
use clap::ValueEnum;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display, EnumString};

/// On-disk encoding of a stored tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Json,
    JsonGz,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::JsonGz => "json.gz",
        }
    }

    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => OutputFormat::JsonGz,
            _ => OutputFormat::Json,
        }
    }
}

/// Destination of extracted tensors.
pub trait TensorStore {
    /// Stores `tensor` under `name` below `output_path`, returning the file written.
    fn store(&self, tensor: &TokenizedTensor, output_path: &Path, name: &str) -> Result<PathBuf>;
}

/// Writes one JSON (optionally gzip-compressed) file per tensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTensorStore {
    format: OutputFormat,
}

impl FileTensorStore {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Reads back a tensor written by [`TensorStore::store`].
    pub fn load(path: impl AsRef<Path>) -> Result<TokenizedTensor> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let tensor = match OutputFormat::from_path(path) {
            OutputFormat::JsonGz => serde_json::from_reader(GzDecoder::new(reader))?,
            OutputFormat::Json => serde_json::from_reader(reader)?,
        };
        Ok(tensor)
    }
}

impl TensorStore for FileTensorStore {
    fn store(&self, tensor: &TokenizedTensor, output_path: &Path, name: &str) -> Result<PathBuf> {
        let file_name = format!("{}.{}", sanitize_name(name), self.format.extension());
        if file_name.starts_with('.') {
            return Err(ExtractorError::config(format!("cannot store a tensor as `{name}`")));
        }

        fs::create_dir_all(output_path)?;
        let path = output_path.join(file_name);
        let writer = BufWriter::new(File::create(&path)?);

        match self.format {
            OutputFormat::Json => {
                let mut writer = writer;
                serde_json::to_writer(&mut writer, tensor)?;
                writer.flush()?;
            }
            OutputFormat::JsonGz => {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                serde_json::to_writer(&mut encoder, tensor)?;
                encoder.finish()?.flush()?;
            }
        }

        tracing::info!("Stored tensor at {}", path.display());
        Ok(path)
    }
}

/// Replaces everything but ASCII alphanumerics, `-`, `_` and `.` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Name a run's output is stored under.
pub fn store_name(extractor_type: &str, locator: &str) -> String {
    format!("{extractor_type}_{locator}")
}
