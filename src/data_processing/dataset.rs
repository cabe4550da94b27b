// Данный модуль описывает данные, которые передаются между этапами конвейера: сырые записи
// каждого набора данных, предобработанные пары предложений и меток, а также итоговый
// токенизированный тензор. Части тензора доступны как наборы данных burn, поэтому их можно
// сразу передать в DataLoader.

use crate::error::{ExtractorError, Result};
use burn::data::dataset::Dataset;
use derive_new::new;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Одна декодированная строка отзыва в виде исходного словаря ключ-значение
pub type ReviewRecord = serde_json::Map<String, serde_json::Value>;

/// Плоские столбцы CoNLL. Пустые записи отмечают границы предложений
#[derive(new, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NerRaw {
    pub words: Vec<String>,
    pub labels: Vec<String>,
}

/// Вид классификации, для которой токенизируется набор данных
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    SequenceClassification,
    TokenClassification,
}

/// Параллельные столбцы предложений и меток одинаковой длины
#[derive(Clone, Debug, PartialEq)]
pub struct Examples<S, L> {
    sentences: Vec<S>,
    labels: Vec<L>,
}

impl<S, L> Examples<S, L> {
    /// Объединяет два столбца, отклоняя столбцы разной длины
    pub fn new(sentences: Vec<S>, labels: Vec<L>) -> Result<Self> {
        if sentences.len() != labels.len() {
            return Err(ExtractorError::malformed(format!(
                "{} sentences but {} labels",
                sentences.len(),
                labels.len()
            )));
        }
        Ok(Self { sentences, labels })
    }

    pub fn sentences(&self) -> &[S] {
        &self.sentences
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn into_parts(self) -> (Vec<S>, Vec<L>) {
        (self.sentences, self.labels)
    }
}

/// Примеры с отображенными метками, готовые для токенизатора
#[derive(Clone, Debug, PartialEq)]
pub enum PreprocessedData {
    /// Одна строка и один класс на пример
    Sequence(Examples<String, i64>),
    /// Последовательность слов и один класс на слово
    Token(Examples<Vec<String>, Vec<i64>>),
}

impl PreprocessedData {
    pub fn task(&self) -> TaskKind {
        match self {
            PreprocessedData::Sequence(_) => TaskKind::SequenceClassification,
            PreprocessedData::Token(_) => TaskKind::TokenClassification,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PreprocessedData::Sequence(examples) => examples.len(),
            PreprocessedData::Token(examples) => examples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Проверяет наличие и согласованность столбцов перед токенизацией
    pub fn validate(&self, sentence_col: &str, labels_col: &str) -> Result<()> {
        if self.is_empty() {
            return Err(ExtractorError::validation(format!(
                "columns `{sentence_col}` and `{labels_col}` are empty"
            )));
        }

        if let PreprocessedData::Token(examples) = self {
            for (i, (words, tags)) in examples.sentences().iter().zip(examples.labels()).enumerate() {
                if words.is_empty() {
                    return Err(ExtractorError::validation(format!(
                        "`{sentence_col}` of example {i} has no words"
                    )));
                }
                if words.len() != tags.len() {
                    return Err(ExtractorError::validation(format!(
                        "example {i} has {} words in `{sentence_col}` but {} tags in `{labels_col}`",
                        words.len(),
                        tags.len()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Кодировки фиксированной длины для одной части данных
#[derive(new, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenizedBatch {
    pub input_ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
    /// Исходное слово каждого токена, хранится только для классификации токенов
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_ids: Option<Vec<Vec<Option<u32>>>>,
}

impl TokenizedBatch {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Метки одной части данных, форма зависит от задачи.
///
/// Сериализуются с тегом формы, поэтому даже пустая часть сохраняет свою задачу.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelArray {
    Sequence(Vec<i64>),
    Token(Vec<Vec<i64>>),
}

impl LabelArray {
    pub fn len(&self) -> usize {
        match self {
            LabelArray::Sequence(labels) => labels.len(),
            LabelArray::Token(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Метки одного примера в виде строки, для последовательностей это одно значение
    pub fn row(&self, index: usize) -> Option<Vec<i64>> {
        match self {
            LabelArray::Sequence(labels) => labels.get(index).map(|label| vec![*label]),
            LabelArray::Token(labels) => labels.get(index).cloned(),
        }
    }
}

/// Итоговый результат запуска. Создается один раз и дальше только читается
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenizedTensor {
    max_length: usize,
    train_inputs: TokenizedBatch,
    validation_inputs: TokenizedBatch,
    train_labels: LabelArray,
    validation_labels: LabelArray,
}

impl TokenizedTensor {
    pub(crate) fn assemble(
        max_length: usize,
        train_inputs: TokenizedBatch,
        validation_inputs: TokenizedBatch,
        train_labels: LabelArray,
        validation_labels: LabelArray,
    ) -> Self {
        Self {
            max_length,
            train_inputs,
            validation_inputs,
            train_labels,
            validation_labels,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn train_inputs(&self) -> &TokenizedBatch {
        &self.train_inputs
    }

    pub fn validation_inputs(&self) -> &TokenizedBatch {
        &self.validation_inputs
    }

    pub fn train_labels(&self) -> &LabelArray {
        &self.train_labels
    }

    pub fn validation_labels(&self) -> &LabelArray {
        &self.validation_labels
    }

    pub fn task(&self) -> TaskKind {
        match self.train_labels {
            LabelArray::Sequence(_) => TaskKind::SequenceClassification,
            LabelArray::Token(_) => TaskKind::TokenClassification,
        }
    }

    /// Возвращает обучающую часть как набор данных burn
    pub fn train_dataset(&self) -> TokenizedDataset {
        TokenizedDataset::from_parts(&self.train_inputs, &self.train_labels)
    }

    /// Возвращает валидационную часть как набор данных burn
    pub fn validation_dataset(&self) -> TokenizedDataset {
        TokenizedDataset::from_parts(&self.validation_inputs, &self.validation_labels)
    }
}

/// Один закодированный пример с метками
#[derive(new, Clone, Debug, PartialEq)]
pub struct TokenizedItem {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub labels: Vec<i64>,
}

/// Часть TokenizedTensor в памяти
#[derive(Debug)]
pub struct TokenizedDataset {
    items: Vec<TokenizedItem>,
}

impl TokenizedDataset {
    fn from_parts(inputs: &TokenizedBatch, labels: &LabelArray) -> Self {
        let items = inputs
            .input_ids
            .iter()
            .zip(&inputs.attention_mask)
            .enumerate()
            .filter_map(|(i, (ids, mask))| {
                labels
                    .row(i)
                    .map(|row| TokenizedItem::new(ids.clone(), mask.clone(), row))
            })
            .collect();
        Self { items }
    }
}

impl Dataset<TokenizedItem> for TokenizedDataset {
    fn get(&self, index: usize) -> Option<TokenizedItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_reject_length_mismatch() {
        let err = Examples::new(vec!["a".to_string()], Vec::<i64>::new()).unwrap_err();
        assert!(matches!(err, ExtractorError::MalformedInput(_)));
    }

    #[test]
    fn test_validate_empty_data() {
        let data = PreprocessedData::Sequence(Examples::new(vec![], vec![]).unwrap());
        let err = data.validate("text", "label").unwrap_err();
        assert!(matches!(err, ExtractorError::ValidationFailure(_)));
    }

    #[test]
    fn test_validate_token_lengths() {
        let examples = Examples::new(
            vec![vec!["EU".to_string(), "rejects".to_string()]],
            vec![vec![7]],
        )
        .unwrap();
        let err = PreprocessedData::Token(examples).validate("text", "label").unwrap_err();
        assert!(matches!(err, ExtractorError::ValidationFailure(_)));
    }

    #[test]
    fn test_dataset_rows_follow_task() {
        let inputs = TokenizedBatch::new(vec![vec![2, 5, 3, 0]], vec![vec![1, 1, 1, 0]], None);
        let tensor = TokenizedTensor::assemble(
            4,
            inputs.clone(),
            TokenizedBatch::default(),
            LabelArray::Sequence(vec![4]),
            LabelArray::Sequence(vec![]),
        );

        let dataset = tensor.train_dataset();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get(0).unwrap().labels, vec![4]);
        assert_eq!(tensor.validation_dataset().len(), 0);
        assert_eq!(tensor.task(), TaskKind::SequenceClassification);
    }

    #[test]
    fn test_label_array_serializes_with_its_shape() {
        let labels = LabelArray::Token(vec![vec![-100, 9, -100]]);
        assert_eq!(serde_json::to_string(&labels).unwrap(), r#"{"token":[[-100,9,-100]]}"#);
    }

    #[test]
    fn test_empty_token_partition_keeps_its_task() {
        let tensor = TokenizedTensor::assemble(
            8,
            TokenizedBatch::default(),
            TokenizedBatch::default(),
            LabelArray::Token(vec![]),
            LabelArray::Token(vec![]),
        );

        let json = serde_json::to_string(&tensor).unwrap();
        let back: TokenizedTensor = serde_json::from_str(&json).unwrap();

        assert_eq!(back.train_labels(), &LabelArray::Token(vec![]));
        assert_eq!(back.task(), TaskKind::TokenClassification);
        assert_eq!(back, tensor);
    }
}
