// Amazon product reviews. The dumps are gzip-compressed JSON lines: one object
// per line and no surrounding list, e.g.
//
//   {"overall": 5.0, "summary": "Five Stars", "reviewText": "As advertised."}
//   {"overall": 1.0, "summary": "Broken", "reviewText": "Stopped after a week."}
//
// The lines are joined into a JSON array before parsing. Each review becomes
// "summary : reviewText" labelled with its star rating.

use super::BertExtractor;
use crate::config::ExtractorKind;
use crate::data_processing::{map_review_label, Examples, PreprocessedData, ReviewRecord};
use crate::error::{ExtractorError, Result};
use crate::fetch::Fetcher;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const SENTENCE_SEPARATOR: &str = " : ";

pub struct ReviewsExtractor<F> {
    fetcher: F,
}

impl<F: Fetcher> ReviewsExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: Fetcher> BertExtractor for ReviewsExtractor<F> {
    type Raw = Vec<ReviewRecord>;
    type Preprocessed = Examples<String, f64>;

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Reviews
    }

    fn extract_raw(&mut self, locator: &str) -> Result<Self::Raw> {
        let payload = self.fetcher.fetch(locator)?;
        let records = parse_reviews(&decompress(payload)?)?;
        tracing::info!("Extracted {} reviews from {}", records.len(), locator);
        Ok(records)
    }

    fn preprocess(&self, raw: Self::Raw) -> Result<Self::Preprocessed> {
        let mut sentences = Vec::with_capacity(raw.len());
        let mut ratings = Vec::with_capacity(raw.len());

        for (i, record) in raw.iter().enumerate() {
            let rating = record
                .get("overall")
                .and_then(Value::as_f64)
                .ok_or_else(|| ExtractorError::malformed(format!("review {i} has no numeric `overall`")))?;

            sentences.push(review_sentence(record));
            ratings.push(rating);
        }

        Examples::new(sentences, ratings)
    }

    fn process_labels(&self, examples: Self::Preprocessed) -> Result<PreprocessedData> {
        let (sentences, ratings) = examples.into_parts();
        let labels = ratings
            .into_iter()
            .map(map_review_label)
            .collect::<Result<Vec<_>>>()?;
        Ok(PreprocessedData::Sequence(Examples::new(sentences, labels)?))
    }
}

/// `summary : reviewText`, missing parts read as empty.
pub fn review_sentence(record: &ReviewRecord) -> String {
    let field = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or_default();
    format!("{}{}{}", field("summary"), SENTENCE_SEPARATOR, field("reviewText"))
}

/// Inflates gzip payloads, passes anything else through.
fn decompress(payload: Vec<u8>) -> Result<Vec<u8>> {
    if !payload.starts_with(&GZIP_MAGIC) {
        return Ok(payload);
    }
    let mut decoded = Vec::new();
    GzDecoder::new(payload.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|e| ExtractorError::unavailable(format!("corrupt gzip payload: {e}")))?;
    Ok(decoded)
}

/// Parses newline separated JSON objects.
pub fn parse_reviews(payload: &[u8]) -> Result<Vec<ReviewRecord>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ExtractorError::unavailable(format!("reviews payload is not UTF-8: {e}")))?;

    let objects: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let array = format!("[{}]", objects.join(","));

    serde_json::from_str(&array)
        .map_err(|e| ExtractorError::unavailable(format!("reviews payload is not JSON lines: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn record(json: &str) -> ReviewRecord {
        serde_json::from_str(json).unwrap()
    }

    fn extractor() -> ReviewsExtractor<fn(&str) -> Result<Vec<u8>>> {
        fn unreachable_fetch(_: &str) -> Result<Vec<u8>> {
            Err(ExtractorError::unavailable("offline"))
        }
        ReviewsExtractor::new(unreachable_fetch as fn(&str) -> Result<Vec<u8>>)
    }

    #[test]
    fn test_review_becomes_sentence_and_label() {
        let extractor = extractor();
        let raw = vec![record(
            r#"{"summary": "Five Stars", "reviewText": "As advertised.", "overall": 5.0}"#,
        )];

        let examples = extractor.preprocess(raw).unwrap();
        assert_eq!(examples.sentences(), ["Five Stars : As advertised.".to_string()]);

        let data = extractor.process_labels(examples).unwrap();
        let PreprocessedData::Sequence(examples) = data else {
            panic!("reviews are a sequence task");
        };
        assert_eq!(examples.labels(), [4]);
    }

    #[test]
    fn test_missing_text_fields_read_as_empty() {
        let sentence = review_sentence(&record(r#"{"reviewText": "Works", "overall": 3}"#));
        assert_eq!(sentence, " : Works");
    }

    #[test]
    fn test_missing_rating_is_malformed() {
        let raw = vec![record(r#"{"summary": "No stars", "reviewText": "?"}"#)];
        assert!(matches!(
            extractor().preprocess(raw).unwrap_err(),
            ExtractorError::MalformedInput(_)
        ));
    }

    #[test]
    fn test_rating_out_of_range_is_malformed() {
        let examples = Examples::new(vec!["x".to_string()], vec![6.0]).unwrap();
        assert!(matches!(
            extractor().process_labels(examples).unwrap_err(),
            ExtractorError::MalformedInput(_)
        ));
    }

    #[test]
    fn test_json_lines_are_repaired() {
        let payload = b"{\"overall\": 5.0}\n{\"overall\": 1.0}\r\n\n{\"overall\": 3.0}\n";
        let records = parse_reviews(payload).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["overall"], 1.0);
    }

    #[test]
    fn test_invalid_payload_is_unavailable() {
        assert!(matches!(
            parse_reviews(b"<html>Not Found</html>").unwrap_err(),
            ExtractorError::DataUnavailable(_)
        ));
    }

    #[test]
    fn test_gzip_payload_is_inflated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"{\"overall\": 2.0, \"summary\": \"Meh\"}\n")
            .unwrap();
        let gz = encoder.finish().unwrap();

        let mut extractor = ReviewsExtractor::new(move |_: &str| -> Result<Vec<u8>> { Ok(gz.clone()) });
        let records = extractor.extract_raw("http://reviews/x.json.gz").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["summary"], "Meh");
    }

    #[test]
    fn test_fetch_failure_propagates() {
        assert!(matches!(
            extractor().extract_raw("http://reviews/x.json.gz").unwrap_err(),
            ExtractorError::DataUnavailable(_)
        ));
    }
}
