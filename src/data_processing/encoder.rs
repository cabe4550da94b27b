// Модуль превращает примеры с отображенными метками в TokenizedTensor фиксированной формы.
//
// Весь набор данных имеет одну длину последовательности: самое длинное закодированное
// предложение, ограниченное длиной модели и округленное вверх до кратного 8. Затем каждое
// предложение обрезается или дополняется до этой длины. Для NER метки слов распределяются
// по позициям подслов, и в конце строки делятся на обучающую и валидационную части.

use super::dataset::{LabelArray, PreprocessedData, TokenizedBatch, TokenizedTensor};
use super::labels::{align_labels, SubwordLabelPolicy};
use super::splitter::{split_indices, take_indices, SplitIndices, SPLIT_SEED};
use super::tokenizer::{EncodedSentence, SentenceInput, Tokenizer};
use crate::error::{ExtractorError, Result};
use derive_new::new;
use std::sync::Arc;

/// Наименьшее кратное 8, которое `>= n`
pub fn round_up_to_multiple_of_8(n: usize) -> usize {
    (n + 7) & !7
}

/// Структура для кодирования предобработанных примеров в TokenizedTensor
#[derive(new)]
pub struct SentenceEncoder {
    tokenizer: Arc<dyn Tokenizer>,    // Токенизатор для конвертации текста в токены
    validation_fraction: f64,         // Доля примеров для валидации
    label_policy: SubwordLabelPolicy, // Разметка подслов внутри слова
}

impl SentenceEncoder {
    /// Общая длина последовательности для `sentences`
    pub fn max_length(&self, sentences: &[SentenceInput]) -> Result<usize> {
        let texts: Vec<String> = sentences.iter().map(SentenceInput::joined).collect();
        let longest = self
            .tokenizer
            .count_tokens(&texts)?
            .into_iter()
            .max()
            .unwrap_or(0);
        let clipped = longest.min(self.tokenizer.model_max_length());
        Ok(round_up_to_multiple_of_8(clipped))
    }

    /// Выполняет весь этап токенизации
    pub fn encode(&self, data: PreprocessedData) -> Result<TokenizedTensor> {
        let split = split_indices(data.len(), self.validation_fraction, SPLIT_SEED);
        if split.train.is_empty() {
            return Err(ExtractorError::validation(format!(
                "{} examples with validation fraction {} leave no training examples",
                data.len(),
                self.validation_fraction
            )));
        }

        let tensor = match data {
            PreprocessedData::Sequence(examples) => {
                let (sentences, labels) = examples.into_parts();
                let inputs: Vec<SentenceInput> =
                    sentences.into_iter().map(SentenceInput::Text).collect();
                let (max_length, encoded) = self.encode_all(&inputs)?;

                let (train_inputs, validation_inputs) = partition_inputs(encoded, &split, false);
                let mut labels: Vec<Option<i64>> = labels.into_iter().map(Some).collect();
                TokenizedTensor::assemble(
                    max_length,
                    train_inputs,
                    validation_inputs,
                    LabelArray::Sequence(take_indices(&mut labels, &split.train)),
                    LabelArray::Sequence(take_indices(&mut labels, &split.validation)),
                )
            }
            PreprocessedData::Token(examples) => {
                let (sentences, word_labels) = examples.into_parts();
                let inputs: Vec<SentenceInput> =
                    sentences.into_iter().map(SentenceInput::Words).collect();
                let (max_length, encoded) = self.encode_all(&inputs)?;

                let mut labels = encoded
                    .iter()
                    .zip(&word_labels)
                    .map(|(sentence, tags)| {
                        align_labels(&sentence.word_ids, tags, self.label_policy).map(Some)
                    })
                    .collect::<Result<Vec<_>>>()?;

                let (train_inputs, validation_inputs) = partition_inputs(encoded, &split, true);
                TokenizedTensor::assemble(
                    max_length,
                    train_inputs,
                    validation_inputs,
                    LabelArray::Token(take_indices(&mut labels, &split.train)),
                    LabelArray::Token(take_indices(&mut labels, &split.validation)),
                )
            }
        };

        tracing::info!(
            "Tokenized {} training and {} validation examples to length {}",
            tensor.train_inputs().len(),
            tensor.validation_inputs().len(),
            tensor.max_length()
        );
        Ok(tensor)
    }

    fn encode_all(&self, inputs: &[SentenceInput]) -> Result<(usize, Vec<EncodedSentence>)> {
        let max_length = self.max_length(inputs)?;
        tracing::debug!("Encoding {} sentences to {} tokens", inputs.len(), max_length);
        let encoded = self.tokenizer.encode_fixed(inputs, max_length)?;
        Ok((max_length, encoded))
    }
}

fn partition_inputs(
    encoded: Vec<EncodedSentence>,
    split: &SplitIndices,
    keep_word_ids: bool,
) -> (TokenizedBatch, TokenizedBatch) {
    let mut encoded: Vec<Option<EncodedSentence>> = encoded.into_iter().map(Some).collect();
    let train = take_indices(&mut encoded, &split.train);
    let validation = take_indices(&mut encoded, &split.validation);
    (
        to_batch(train, keep_word_ids),
        to_batch(validation, keep_word_ids),
    )
}

fn to_batch(sentences: Vec<EncodedSentence>, keep_word_ids: bool) -> TokenizedBatch {
    let mut input_ids = Vec::with_capacity(sentences.len());
    let mut attention_mask = Vec::with_capacity(sentences.len());
    let mut word_ids = Vec::with_capacity(sentences.len());

    for sentence in sentences {
        input_ids.push(sentence.input_ids);
        attention_mask.push(sentence.attention_mask);
        word_ids.push(sentence.word_ids);
    }

    TokenizedBatch::new(input_ids, attention_mask, keep_word_ids.then_some(word_ids))
}
