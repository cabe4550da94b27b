//! Dataset extractors and the pipeline that runs them.
//!
//! An extractor knows how to pull one dataset family and shape it into
//! label-mapped examples. [`ExtractionPipeline`] drives any extractor through
//! the same stages: cached raw extraction, preprocessing, label mapping,
//! validation and tokenization.

mod ner;
mod reviews;

pub use ner::*;
pub use reviews::*;

use crate::cache::CacheStore;
use crate::config::{ExtractorConfig, ExtractorKind, RunConfig};
use crate::data_processing::{
    BertTokenizer, PreprocessedData, SentenceEncoder, TokenizedTensor, Tokenizer,
};
use crate::error::{ExtractorError, Result};
use crate::fetch::{HttpFetcher, KaggleClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Capabilities every dataset family provides.
pub trait BertExtractor {
    /// Dataset-specific raw structure. This is what the cache stores.
    type Raw: Serialize + DeserializeOwned;
    /// Examples before their labels are mapped to class indices.
    type Preprocessed;

    fn kind(&self) -> ExtractorKind;

    /// Pulls the raw dataset behind `locator`.
    fn extract_raw(&mut self, locator: &str) -> Result<Self::Raw>;

    /// Shapes raw records into sentence and label columns.
    fn preprocess(&self, raw: Self::Raw) -> Result<Self::Preprocessed>;

    /// Maps the raw labels into the dense label space of the task.
    fn process_labels(&self, examples: Self::Preprocessed) -> Result<PreprocessedData>;
}

/// Runs an extractor end to end.
pub struct ExtractionPipeline<E> {
    extractor: E,
    settings: ExtractorConfig,
    cache: CacheStore,
}

impl<E: BertExtractor> ExtractionPipeline<E> {
    pub fn new(extractor: E, settings: ExtractorConfig) -> Self {
        let cache = CacheStore::new(settings.cache_dir.clone());
        Self {
            extractor,
            settings,
            cache,
        }
    }

    /// Raw extraction through the cache, then preprocessing and label mapping.
    pub fn preprocessed(&mut self, locator: &str) -> Result<PreprocessedData> {
        let extractor = &mut self.extractor;
        let raw = self
            .cache
            .cached(locator, self.settings.read_cache, || extractor.extract_raw(locator))?;

        let examples = self.extractor.preprocess(raw)?;
        let data = self.extractor.process_labels(examples)?;
        tracing::info!("Preprocessed {} {} examples", data.len(), self.extractor.kind());

        data.validate(&self.settings.sentence_col, &self.settings.labels_col)?;
        Ok(data)
    }

    /// Runs every stage and returns the tokenized tensor.
    ///
    /// `load_tokenizer` receives the configured vocabulary identifier and is
    /// called once the data has been validated, before any sentence is
    /// encoded.
    pub fn extract_preprocess<L>(&mut self, locator: &str, load_tokenizer: L) -> Result<TokenizedTensor>
    where
        L: FnOnce(&str) -> Result<Arc<dyn Tokenizer>>,
    {
        let data = self.preprocessed(locator)?;
        let tokenizer = load_tokenizer(&self.settings.pretrained_model_name_or_path)?;

        SentenceEncoder::new(
            tokenizer,
            self.settings.split_test_size,
            self.settings.subword_label_policy,
        )
        .encode(data)
    }
}

/// Loads the pretrained vocabulary from the Hugging Face hub.
pub fn load_pretrained_tokenizer(identifier: &str) -> Result<Arc<dyn Tokenizer>> {
    Ok(Arc::new(BertTokenizer::from_pretrained(identifier)?))
}

/// Pipeline for one of the supported dataset families.
pub enum Extractor {
    Reviews(ExtractionPipeline<ReviewsExtractor<HttpFetcher>>),
    Ner(ExtractionPipeline<NerExtractor<KaggleClient>>),
}

impl Extractor {
    /// Builds the pipeline selected by `extractor_type`, backed by the real
    /// network collaborators.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let settings = config.extractor_config.clone();
        match config.extractor_type {
            ExtractorKind::Reviews => {
                let extractor = ReviewsExtractor::new(HttpFetcher::new()?);
                Ok(Extractor::Reviews(ExtractionPipeline::new(extractor, settings)))
            }
            ExtractorKind::Ner => {
                let credentials = settings.credentials().ok_or_else(|| {
                    ExtractorError::config("the ner extractor needs auth_username and auth_key")
                })?;
                let extractor = NerExtractor::new(KaggleClient::new(credentials)?);
                Ok(Extractor::Ner(ExtractionPipeline::new(extractor, settings)))
            }
        }
    }

    pub fn extract_preprocess(&mut self, locator: &str) -> Result<TokenizedTensor> {
        match self {
            Extractor::Reviews(pipeline) => pipeline.extract_preprocess(locator, load_pretrained_tokenizer),
            Extractor::Ner(pipeline) => pipeline.extract_preprocess(locator, load_pretrained_tokenizer),
        }
    }
}
