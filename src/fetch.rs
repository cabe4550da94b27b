//! Remote collaborators of the raw extractors.
//!
//! [`Fetcher`] pulls a payload from a locator, [`DatasetDownloader`] pulls an
//! authenticated dataset into a local directory. Both fail with
//! [`ExtractorError::DataUnavailable`] and never retry.

use crate::error::{ExtractorError, Result};
use reqwest::blocking::Client;
use std::path::PathBuf;
use std::time::Duration;

const USER_AGENT: &str = concat!("bert_extractor/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const KAGGLE_API: &str = "https://www.kaggle.com/api/v1";

/// Files of a CoNLL-2003 dataset, in concatenation order.
pub const CONLL_PARTITIONS: [&str; 3] = ["train", "valid", "test"];

/// Fetches the bytes behind a locator.
pub trait Fetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

impl<F> Fetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        self(locator)
    }
}

/// Plain HTTP GET.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        tracing::info!("Fetching {}", locator);
        let response = self
            .client
            .get(locator)
            .send()
            .map_err(|e| ExtractorError::unavailable(format!("request to {locator} failed: {e}")))?;
        read_body(response, locator)
    }
}

/// Account used against an authenticated dataset host.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Downloads a dataset that sits behind authentication.
pub trait DatasetDownloader {
    /// Checks the credentials; must succeed before [`Self::download`].
    fn authenticate(&mut self) -> Result<()>;

    /// Downloads the dataset files into a new directory and returns it.
    /// The caller owns the directory and removes it when done.
    fn download(&self, dataset_id: &str) -> Result<PathBuf>;
}

/// Kaggle public API client.
pub struct KaggleClient {
    client: Client,
    credentials: Credentials,
    authenticated: bool,
}

impl KaggleClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            credentials,
            authenticated: false,
        })
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .map_err(|e| ExtractorError::unavailable(format!("request to {url} failed: {e}")))?;
        read_body(response, url)
    }
}

impl DatasetDownloader for KaggleClient {
    fn authenticate(&mut self) -> Result<()> {
        if self.credentials.username.is_empty() || self.credentials.key.is_empty() {
            return Err(ExtractorError::unavailable("Kaggle credentials are empty"));
        }
        // Any authenticated endpoint rejects bad credentials with 401.
        self.get(&format!("{KAGGLE_API}/datasets/list?page=1"))?;
        self.authenticated = true;
        tracing::info!("Authenticated to Kaggle as {}", self.credentials.username);
        Ok(())
    }

    fn download(&self, dataset_id: &str) -> Result<PathBuf> {
        if !self.authenticated {
            return Err(ExtractorError::unavailable(
                "Kaggle download requested before authentication",
            ));
        }

        let dir = tempfile::Builder::new()
            .prefix("bert_extractor_kaggle")
            .tempdir()?
            .into_path();

        for partition in CONLL_PARTITIONS {
            let file_name = format!("{partition}.txt");
            let url = format!("{KAGGLE_API}/datasets/download/{dataset_id}/{file_name}");
            tracing::info!("Downloading {}", url);
            let bytes = match self.get(&url) {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = std::fs::remove_dir_all(&dir);
                    return Err(e);
                }
            };
            std::fs::write(dir.join(&file_name), bytes)?;
        }

        Ok(dir)
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ExtractorError::unavailable(format!("cannot build HTTP client: {e}")))
}

fn read_body(response: reqwest::blocking::Response, locator: &str) -> Result<Vec<u8>> {
    if !response.status().is_success() {
        return Err(ExtractorError::unavailable(format!(
            "{locator} answered HTTP {}",
            response.status()
        )));
    }
    response
        .bytes()
        .map(|bytes| bytes.to_vec())
        .map_err(|e| ExtractorError::unavailable(format!("cannot read body of {locator}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_fetchers() {
        let fetcher = |locator: &str| -> Result<Vec<u8>> { Ok(locator.as_bytes().to_vec()) };
        assert_eq!(fetcher.fetch("abc").unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_download_requires_authentication() {
        let client = KaggleClient::new(Credentials::new("user", "key")).unwrap();
        let err = client.download("alaakhaled/conll003-englishversion").unwrap_err();
        assert!(matches!(err, ExtractorError::DataUnavailable(_)));
    }

    #[test]
    fn test_empty_credentials_fail_authentication() {
        let mut client = KaggleClient::new(Credentials::new("", "")).unwrap();
        assert!(matches!(
            client.authenticate().unwrap_err(),
            ExtractorError::DataUnavailable(_)
        ));
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let debug = format!("{:?}", Credentials::new("user", "secret"));
        assert!(!debug.contains("secret"));
    }
}
