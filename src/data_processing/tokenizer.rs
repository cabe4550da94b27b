// Данный модуль определяет трейт Tokenizer, который представляет общий интерфейс токенизатора
// для кодировщика. Конкретная реализация этого трейта, BertTokenizer, использует предобученный
// словарь WordPiece из библиотеки `tokenizers`. Предложения приходят либо обычным текстом, либо
// уже разбитыми на слова (NER), и тогда каждый токен помнит индекс слова, из которого получен.

use crate::error::{ExtractorError, Result};
use tokenizers::{
    EncodeInput, PaddingDirection, PaddingParams, PaddingStrategy, TruncationParams,
};

/// Максимальная длина последовательности BERT, если словарь ее не задает
pub const DEFAULT_MODEL_MAX_LENGTH: usize = 512;

/// Предложение в одной из двух входных форм
#[derive(Clone, Debug, PartialEq)]
pub enum SentenceInput {
    Text(String),
    Words(Vec<String>),
}

impl SentenceInput {
    /// Текст для подсчета токенов. Слова соединяются пробелами
    pub fn joined(&self) -> String {
        match self {
            SentenceInput::Text(text) => text.clone(),
            SentenceInput::Words(words) => words.join(" "),
        }
    }

    fn to_encode_input(&self) -> EncodeInput<'_> {
        match self {
            SentenceInput::Text(text) => text.as_str().into(),
            SentenceInput::Words(words) => words.as_slice().into(),
        }
    }
}

/// Предложение, закодированное до фиксированной длины
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedSentence {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Исходное слово для каждой позиции, `None` для специальных токенов и заполнения
    pub word_ids: Vec<Option<u32>>,
}

pub trait Tokenizer: Send + Sync {
    /// Количество токенов каждого текста со специальными токенами, без заполнения
    fn count_tokens(&self, texts: &[String]) -> Result<Vec<usize>>;

    /// Кодирует каждое предложение ровно в `max_length` токенов.
    ///
    /// Длинные предложения обрезаются, короткие дополняются справа. Порядок результата
    /// совпадает с порядком входа.
    fn encode_fixed(&self, sentences: &[SentenceInput], max_length: usize)
        -> Result<Vec<EncodedSentence>>;

    /// Получает токен, используемый для дополнения последовательностей до одинаковой длины
    fn pad_token(&self) -> u32;

    /// Максимальная длина последовательности, которую принимает модель
    fn model_max_length(&self) -> usize {
        DEFAULT_MODEL_MAX_LENGTH
    }
}

/// Структура для предобученного токенизатора BERT WordPiece
pub struct BertTokenizer {
    tokenizer: tokenizers::Tokenizer,
}

impl BertTokenizer {
    /// Загружает словарь по идентификатору из Hugging Face hub или локального кэша
    pub fn from_pretrained(identifier: &str) -> Result<Self> {
        tracing::info!("Loading tokenizer `{}`", identifier);
        let tokenizer = tokenizers::Tokenizer::from_pretrained(identifier, None).map_err(|e| {
            ExtractorError::TokenizerUnavailable(format!("cannot resolve `{identifier}`: {e}"))
        })?;
        Ok(Self { tokenizer })
    }

    /// Создает токенизатор из сериализованного `tokenizer.json`
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let tokenizer = tokenizers::Tokenizer::from_bytes(bytes).map_err(|e| {
            ExtractorError::TokenizerUnavailable(format!("invalid tokenizer definition: {e}"))
        })?;
        Ok(Self { tokenizer })
    }

    /// Копия внутреннего токенизатора с обрезкой и дополнением до `max_length`
    fn fixed_length(&self, max_length: usize) -> Result<tokenizers::Tokenizer> {
        let mut tokenizer = self.tokenizer.clone();
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ExtractorError::malformed(format!("invalid truncation: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            direction: PaddingDirection::Right,
            pad_id: self.pad_token(),
            pad_token: self.pad_token_value(),
            ..Default::default()
        }));
        Ok(tokenizer)
    }

    fn pad_token_value(&self) -> String {
        self.tokenizer
            .get_padding()
            .map(|padding| padding.pad_token.clone())
            .unwrap_or_else(|| "[PAD]".to_string())
    }
}

impl Tokenizer for BertTokenizer {
    fn count_tokens(&self, texts: &[String]) -> Result<Vec<usize>> {
        let mut tokenizer = self.tokenizer.clone();
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| ExtractorError::malformed(format!("invalid truncation: {e}")))?;

        let inputs: Vec<EncodeInput> = texts.iter().map(|text| text.as_str().into()).collect();
        let encodings = tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| ExtractorError::malformed(format!("cannot tokenize sentence: {e}")))?;
        Ok(encodings.iter().map(|encoding| encoding.len()).collect())
    }

    fn encode_fixed(
        &self,
        sentences: &[SentenceInput],
        max_length: usize,
    ) -> Result<Vec<EncodedSentence>> {
        let tokenizer = self.fixed_length(max_length)?;
        let inputs: Vec<EncodeInput> = sentences.iter().map(SentenceInput::to_encode_input).collect();

        // encode_batch работает параллельно и сохраняет порядок входа
        let encodings = tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| ExtractorError::malformed(format!("cannot tokenize sentence: {e}")))?;

        Ok(encodings
            .into_iter()
            .map(|encoding| EncodedSentence {
                input_ids: encoding.get_ids().to_vec(),
                attention_mask: encoding.get_attention_mask().to_vec(),
                word_ids: encoding.get_word_ids().to_vec(),
            })
            .collect())
    }

    fn pad_token(&self) -> u32 {
        self.tokenizer
            .get_padding()
            .map(|padding| padding.pad_id)
            .or_else(|| self.tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0)
    }

    fn model_max_length(&self) -> usize {
        self.tokenizer
            .get_truncation()
            .map(|truncation| truncation.max_length)
            .unwrap_or(DEFAULT_MODEL_MAX_LENGTH)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::BertTokenizer;

    /// Маленький словарь WordPiece, общий с интеграционными тестами
    pub(crate) fn fixture_tokenizer() -> BertTokenizer {
        BertTokenizer::from_bytes(include_bytes!("../../tests/fixtures/tokenizer.json"))
            .expect("fixture tokenizer")
    }
}
