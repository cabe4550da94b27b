pub mod cache;
pub mod config;
pub mod data_processing;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod storage;

pub use config::{ExtractorConfig, ExtractorKind, RunConfig};
pub use data_processing::{TokenizedBatcher, TokenizedTensor};
pub use error::{ExtractorError, Result};
pub use extractors::{ExtractionPipeline, Extractor};
pub use storage::{FileTensorStore, OutputFormat, TensorStore};
