// Run configuration. Loaded from JSON through burn's Config trait, the same
// mechanism used for experiment configs, with serde filling in the defaults.
//
// {
//   "extractor_type": "reviews",
//   "extractor_url": "beauty",
//   "extractor_config": {
//     "pretrained_model_name_or_path": "bert-base-uncased",
//     "sentence_col": "text",
//     "labels_col": "label"
//   }
// }

use crate::data_processing::SubwordLabelPolicy;
use crate::error::{ExtractorError, Result};
use crate::fetch::Credentials;
use burn::config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, Display, EnumString};

/// Amazon review 5-core dumps addressable by a short name.
pub const REVIEWS_DATASETS: [(&str, &str); 3] = [
    (
        "fashion",
        "http://deepyeti.ucsd.edu/jianmo/amazon/categoryFilesSmall/AMAZON_FASHION_5.json.gz",
    ),
    (
        "beauty",
        "http://deepyeti.ucsd.edu/jianmo/amazon/categoryFilesSmall/All_Beauty_5.json.gz",
    ),
    (
        "appliances",
        "http://deepyeti.ucsd.edu/jianmo/amazon/categoryFilesSmall/Appliances_5.json.gz",
    ),
];

/// Kaggle datasets addressable by a short name.
pub const NER_KAGGLE_DATASETS: [(&str, &str); 1] =
    [("CoNLL003", "alaakhaled/conll003-englishversion")];

/// Dataset family handled by a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExtractorKind {
    Reviews,
    Ner,
}

/// Settings shared by both extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Hub identifier of the pretrained vocabulary.
    pub pretrained_model_name_or_path: String,
    pub sentence_col: String,
    pub labels_col: String,
    #[serde(default)]
    pub auth_username: Option<String>,
    #[serde(default)]
    pub auth_key: Option<String>,
    /// Fraction of examples held out for validation.
    #[serde(default = "default_split_test_size")]
    pub split_test_size: f64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub read_cache: bool,
    #[serde(default)]
    pub subword_label_policy: SubwordLabelPolicy,
}

impl Config for ExtractorConfig {}

fn default_split_test_size() -> f64 {
    0.1
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("bert_extractor")
}

impl ExtractorConfig {
    pub fn new(
        pretrained_model_name_or_path: impl Into<String>,
        sentence_col: impl Into<String>,
        labels_col: impl Into<String>,
    ) -> Self {
        Self {
            pretrained_model_name_or_path: pretrained_model_name_or_path.into(),
            sentence_col: sentence_col.into(),
            labels_col: labels_col.into(),
            auth_username: None,
            auth_key: None,
            split_test_size: default_split_test_size(),
            cache_dir: default_cache_dir(),
            read_cache: false,
            subword_label_policy: SubwordLabelPolicy::default(),
        }
    }

    pub fn with_split_test_size(mut self, split_test_size: f64) -> Self {
        self.split_test_size = split_test_size;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_read_cache(mut self, read_cache: bool) -> Self {
        self.read_cache = read_cache;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, key: impl Into<String>) -> Self {
        self.auth_username = Some(username.into());
        self.auth_key = Some(key.into());
        self
    }

    pub fn with_subword_label_policy(mut self, policy: SubwordLabelPolicy) -> Self {
        self.subword_label_policy = policy;
        self
    }

    /// Credentials, when both halves are present.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.auth_username, &self.auth_key) {
            (Some(username), Some(key)) => Some(Credentials::new(username, key)),
            _ => None,
        }
    }

    pub fn validate(&self, kind: ExtractorKind) -> Result<()> {
        if self.pretrained_model_name_or_path.trim().is_empty() {
            return Err(ExtractorError::config("pretrained_model_name_or_path is empty"));
        }
        if self.sentence_col.trim().is_empty() || self.labels_col.trim().is_empty() {
            return Err(ExtractorError::config("sentence_col and labels_col must be set"));
        }
        if self.sentence_col == self.labels_col {
            return Err(ExtractorError::config(format!(
                "sentence_col and labels_col are both `{}`",
                self.sentence_col
            )));
        }
        if !(self.split_test_size > 0.0 && self.split_test_size < 1.0) {
            return Err(ExtractorError::config(format!(
                "split_test_size must be in (0, 1), got {}",
                self.split_test_size
            )));
        }
        if kind == ExtractorKind::Ner && self.credentials().is_none() {
            return Err(ExtractorError::config(
                "the ner extractor needs auth_username and auth_key",
            ));
        }
        Ok(())
    }
}

/// Top level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub extractor_type: ExtractorKind,
    pub extractor_url: String,
    pub extractor_config: ExtractorConfig,
}

impl Config for RunConfig {}

impl RunConfig {
    pub fn new(
        extractor_type: ExtractorKind,
        extractor_url: impl Into<String>,
        extractor_config: ExtractorConfig,
    ) -> Self {
        Self {
            extractor_type,
            extractor_url: extractor_url.into(),
            extractor_config,
        }
    }

    /// Reads and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path).map_err(|e| {
            ExtractorError::config(format!("cannot load {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExtractorError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extractor_url.trim().is_empty() {
            return Err(ExtractorError::config("extractor_url is empty"));
        }
        self.extractor_config.validate(self.extractor_type)
    }

    /// Locator behind `extractor_url`, resolving the known short names.
    pub fn locator(&self) -> String {
        let aliases: &[(&str, &str)] = match self.extractor_type {
            ExtractorKind::Reviews => &REVIEWS_DATASETS,
            ExtractorKind::Ner => &NER_KAGGLE_DATASETS,
        };
        aliases
            .iter()
            .find(|(name, _)| *name == self.extractor_url)
            .map(|(_, locator)| locator.to_string())
            .unwrap_or_else(|| self.extractor_url.clone())
    }
}
