// CoNLL-2003 named entity recognition data from Kaggle.
//
// Each partition file holds one token per line, `word POS chunk tag`, with a
// blank line between sentences and `-DOCSTART-` lines between documents:
//
//   -DOCSTART- -X- -X- O
//
//   SOCCER NN B-NP O
//   JAPAN NNP B-NP B-LOC
//
// Partitions are read train, valid, test and kept as two flat columns where
// blank entries mark sentence boundaries.

use super::BertExtractor;
use crate::config::ExtractorKind;
use crate::data_processing::{map_ner_label, Examples, NerRaw, PreprocessedData};
use crate::error::{ExtractorError, Result};
use crate::fetch::{DatasetDownloader, CONLL_PARTITIONS};
use std::fs;
use std::path::Path;

/// Marker line separating documents.
pub const DOCSTART: &str = "-DOCSTART-";

pub struct NerExtractor<D> {
    downloader: D,
}

impl<D: DatasetDownloader> NerExtractor<D> {
    pub fn new(downloader: D) -> Self {
        Self { downloader }
    }
}

impl<D: DatasetDownloader> BertExtractor for NerExtractor<D> {
    type Raw = NerRaw;
    type Preprocessed = Examples<Vec<String>, Vec<String>>;

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Ner
    }

    fn extract_raw(&mut self, locator: &str) -> Result<Self::Raw> {
        tracing::info!("Going to get data from {}", locator);
        self.downloader.authenticate()?;
        let dir = self.downloader.download(locator)?;

        let raw = read_partitions(&dir);
        if let Err(e) = fs::remove_dir_all(&dir) {
            tracing::warn!("Could not remove {}: {}", dir.display(), e);
        }

        let raw = raw?;
        tracing::info!("Extracted {} CoNLL lines", raw.words.len());
        Ok(raw)
    }

    fn preprocess(&self, raw: Self::Raw) -> Result<Self::Preprocessed> {
        if raw.words.len() != raw.labels.len() {
            return Err(ExtractorError::malformed(format!(
                "{} words but {} labels",
                raw.words.len(),
                raw.labels.len()
            )));
        }

        let mut sentences = Vec::new();
        let mut tags = Vec::new();
        let mut words_buffer = Vec::new();
        let mut tags_buffer = Vec::new();

        for (word, tag) in raw.words.into_iter().zip(raw.labels) {
            if word.is_empty() {
                if !words_buffer.is_empty() {
                    sentences.push(std::mem::take(&mut words_buffer));
                    tags.push(std::mem::take(&mut tags_buffer));
                }
            } else if word != DOCSTART {
                words_buffer.push(word);
                tags_buffer.push(tag);
            }
        }
        if !words_buffer.is_empty() {
            sentences.push(words_buffer);
            tags.push(tags_buffer);
        }

        Examples::new(sentences, tags)
    }

    fn process_labels(&self, examples: Self::Preprocessed) -> Result<PreprocessedData> {
        let (sentences, tags) = examples.into_parts();
        let labels = tags
            .iter()
            .map(|sentence| {
                sentence
                    .iter()
                    .map(|tag| map_ner_label(tag))
                    .collect::<Result<Vec<i64>>>()
            })
            .collect::<Result<Vec<Vec<i64>>>>()?;
        Ok(PreprocessedData::Token(Examples::new(sentences, labels)?))
    }
}

/// Reads every partition of a downloaded dataset in order.
fn read_partitions(dir: &Path) -> Result<NerRaw> {
    let mut raw = NerRaw::default();
    for partition in CONLL_PARTITIONS {
        let path = dir.join(format!("{partition}.txt"));
        let content = fs::read_to_string(&path).map_err(|e| {
            ExtractorError::malformed(format!("cannot read partition {}: {}", path.display(), e))
        })?;
        parse_conll(&content, &mut raw)?;
    }
    Ok(raw)
}

/// Appends the word and tag columns of one CoNLL file to `raw`.
pub fn parse_conll(content: &str, raw: &mut NerRaw) -> Result<()> {
    for (number, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => {
                raw.words.push(String::new());
                raw.labels.push(String::new());
            }
            [word, .., tag] => {
                raw.words.push(word.to_string());
                raw.labels.push(tag.to_string());
            }
            [_] => {
                return Err(ExtractorError::unavailable(format!(
                    "line {} has a single field: `{}`",
                    number + 1,
                    line
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Writes fixed partition files into a fresh directory on download.
    struct FakeKaggle {
        partitions: Vec<(&'static str, &'static str)>,
        authenticated: bool,
        downloads: RefCell<Vec<PathBuf>>,
    }

    impl FakeKaggle {
        fn new(partitions: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                partitions,
                authenticated: false,
                downloads: RefCell::new(Vec::new()),
            }
        }
    }

    impl DatasetDownloader for FakeKaggle {
        fn authenticate(&mut self) -> Result<()> {
            self.authenticated = true;
            Ok(())
        }

        fn download(&self, _dataset_id: &str) -> Result<PathBuf> {
            if !self.authenticated {
                return Err(ExtractorError::unavailable("not authenticated"));
            }
            let dir = tempfile::tempdir()?.into_path();
            for (name, content) in &self.partitions {
                fs::write(dir.join(name), content)?;
            }
            self.downloads.borrow_mut().push(dir.clone());
            Ok(dir)
        }
    }

    const TRAIN: &str = "-DOCSTART- -X- -X- O\n\nSOCCER NN B-NP O\nJAPAN NNP B-NP B-LOC\nWIN VB B-VP O\n, , O O\n";
    const VALID: &str = "\nCRICKET NNP B-NP O\n";
    const TEST: &str = "China NNP B-NP B-LOC\n";

    #[test]
    fn test_docstart_and_boundaries() {
        let extractor = NerExtractor::new(FakeKaggle::new(vec![]));
        let raw = NerRaw::new(
            strings(&["-DOCSTART-", "", "SOCCER", "JAPAN", "WIN", ","]),
            strings(&["O", "", "O", "B-LOC", "O", "O"]),
        );

        let examples = extractor.preprocess(raw).unwrap();
        assert_eq!(examples.sentences(), [strings(&["SOCCER", "JAPAN", "WIN", ","])]);

        let PreprocessedData::Token(examples) = extractor.process_labels(examples).unwrap() else {
            panic!("ner is a token task");
        };
        assert_eq!(examples.labels(), [vec![9, 1, 9, 9]]);
    }

    #[test]
    fn test_unequal_columns_are_malformed() {
        let extractor = NerExtractor::new(FakeKaggle::new(vec![]));
        let raw = NerRaw::new(strings(&["EU", "rejects"]), strings(&["B-ORG"]));
        assert!(matches!(
            extractor.preprocess(raw).unwrap_err(),
            ExtractorError::MalformedInput(_)
        ));
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let extractor = NerExtractor::new(FakeKaggle::new(vec![]));
        let examples = Examples::new(vec![strings(&["EU"])], vec![strings(&["B-XYZ"])]).unwrap();
        assert!(matches!(
            extractor.process_labels(examples).unwrap_err(),
            ExtractorError::MalformedInput(_)
        ));
    }

    #[test]
    fn test_consecutive_boundaries_make_no_empty_sentence() {
        let extractor = NerExtractor::new(FakeKaggle::new(vec![]));
        let raw = NerRaw::new(
            strings(&["", "", "EU", "", "", "-DOCSTART-", "", "Peter"]),
            strings(&["", "", "B-ORG", "", "", "O", "", "B-PER"]),
        );

        let examples = extractor.preprocess(raw).unwrap();
        assert_eq!(examples.sentences(), [strings(&["EU"]), strings(&["Peter"])]);
    }

    #[test]
    fn test_parse_conll_lines() {
        let mut raw = NerRaw::default();
        parse_conll("EU NNP B-NP B-ORG\n\nrejects VBZ B-VP O\n", &mut raw).unwrap();
        assert_eq!(raw.words, strings(&["EU", "", "rejects"]));
        assert_eq!(raw.labels, strings(&["B-ORG", "", "O"]));

        let err = parse_conll("lonely\n", &mut raw).unwrap_err();
        assert!(matches!(err, ExtractorError::DataUnavailable(_)));
    }

    #[test]
    fn test_partitions_are_read_in_order_and_removed() {
        let mut extractor = NerExtractor::new(FakeKaggle::new(vec![
            ("train.txt", TRAIN),
            ("valid.txt", VALID),
            ("test.txt", TEST),
        ]));

        let raw = extractor.extract_raw("alaakhaled/conll003-englishversion").unwrap();
        let examples = extractor.preprocess(raw).unwrap();

        assert_eq!(
            examples.sentences(),
            [
                strings(&["SOCCER", "JAPAN", "WIN", ","]),
                strings(&["CRICKET"]),
                strings(&["China"]),
            ]
        );
        let downloads = extractor.downloader.downloads.borrow();
        assert_eq!(downloads.len(), 1);
        assert!(!downloads[0].exists());
    }

    #[test]
    fn test_missing_partition_is_malformed() {
        let mut extractor = NerExtractor::new(FakeKaggle::new(vec![("train.txt", TRAIN)]));
        assert!(matches!(
            extractor.extract_raw("alaakhaled/conll003-englishversion").unwrap_err(),
            ExtractorError::MalformedInput(_)
        ));
        assert!(!extractor.downloader.downloads.borrow()[0].exists());
    }
}
