// Модуль определяет пространства меток для двух задач и выравнивание меток NER уровня слов
// по позициям подслов. Отзывы используют плотное пространство `rating - 1`, NER использует
// фиксированный словарь из девяти тегов IOB2. Позиции без слова получают SPECIAL_TOKEN_LABEL,
// чтобы функция потерь могла их пропустить.

use crate::error::{ExtractorError, Result};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumCount, EnumIter, EnumString};

/// Метка для позиций, которые не соответствуют входному слову
pub const SPECIAL_TOKEN_LABEL: i64 = -100;

/// Минимальная и максимальная оценка отзыва
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Перечисление для тегов IOB2 набора данных CoNLL-2003
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, EnumCount, AsRefStr)]
pub enum NerTag {
    #[strum(serialize = "B-LOC")]
    BeginLocation,
    #[strum(serialize = "B-PER")]
    BeginPerson,
    #[strum(serialize = "I-PER")]
    InsidePerson,
    #[strum(serialize = "I-LOC")]
    InsideLocation,
    #[strum(serialize = "B-MISC")]
    BeginMiscellaneous,
    #[strum(serialize = "I-MISC")]
    InsideMiscellaneous,
    #[strum(serialize = "B-ORG")]
    BeginOrganization,
    #[strum(serialize = "I-ORG")]
    InsideOrganization,
    #[strum(serialize = "O")]
    Outside,
}

impl NerTag {
    /// Возвращает индекс класса тега. Нумерация начинается с 1, `O` имеет индекс 9
    pub fn label_id(self) -> i64 {
        match self {
            NerTag::BeginLocation => 1,
            NerTag::BeginPerson => 2,
            NerTag::InsidePerson => 3,
            NerTag::InsideLocation => 4,
            NerTag::BeginMiscellaneous => 5,
            NerTag::InsideMiscellaneous => 6,
            NerTag::BeginOrganization => 7,
            NerTag::InsideOrganization => 8,
            NerTag::Outside => 9,
        }
    }

    /// Разбирает строку тега, `None` если тег вне словаря
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

/// Отображает тег NER в индекс класса. Тег вне словаря является ошибкой
pub fn map_ner_label(raw: &str) -> Result<i64> {
    NerTag::parse(raw)
        .map(NerTag::label_id)
        .ok_or_else(|| ExtractorError::malformed(format!("unknown NER tag `{raw}`")))
}

/// Отображает оценку 1-5 в класс `rating - 1`, начиная с нуля
pub fn map_review_label(rating: f64) -> Result<i64> {
    // Сначала приводим к целому, дробная часть отбрасывается
    let rating = rating as i64;
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ExtractorError::malformed(format!(
            "rating {rating} is outside {MIN_RATING}..={MAX_RATING}"
        )));
    }
    Ok(rating - MIN_RATING)
}

/// Как размечаются продолжающие подслова слова
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubwordLabelPolicy {
    /// Каждое подслово несет тег слова
    #[default]
    RepeatFirst,
    /// Тег несет только первое подслово, остальные получают -100
    MaskContinuation,
}

/// Распределяет метки слов по позициям токенов одного закодированного предложения.
///
/// `word_ids[i]` это исходное слово токена `i`, либо `None` для специальных токенов
/// и заполнения.
pub fn align_labels(
    word_ids: &[Option<u32>],
    word_labels: &[i64],
    policy: SubwordLabelPolicy,
) -> Result<Vec<i64>> {
    let mut aligned = Vec::with_capacity(word_ids.len());
    let mut previous: Option<u32> = None;

    for word_id in word_ids {
        let label = match *word_id {
            None => SPECIAL_TOKEN_LABEL,
            Some(word) => {
                let continuation = previous == Some(word);
                match policy {
                    SubwordLabelPolicy::MaskContinuation if continuation => SPECIAL_TOKEN_LABEL,
                    _ => *word_labels.get(word as usize).ok_or_else(|| {
                        ExtractorError::malformed(format!(
                            "token refers to word {word} but the sentence has {} labels",
                            word_labels.len()
                        ))
                    })?,
                }
            }
        };
        aligned.push(label);
        previous = *word_id;
    }

    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn test_ner_vocabulary_is_closed() {
        assert_eq!(NerTag::COUNT, 9);
        let ids: HashSet<i64> = NerTag::iter().map(NerTag::label_id).collect();
        assert_eq!(ids, (1..=9).collect());
    }

    #[test]
    fn test_map_known_tags() {
        assert_eq!(map_ner_label("O").unwrap(), 9);
        assert_eq!(map_ner_label("B-LOC").unwrap(), 1);
        assert_eq!(map_ner_label("I-ORG").unwrap(), 8);
        assert_eq!(NerTag::parse("B-MISC"), Some(NerTag::BeginMiscellaneous));
        assert_eq!(NerTag::BeginMiscellaneous.as_ref(), "B-MISC");
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let err = map_ner_label("B-DATE").unwrap_err();
        assert!(matches!(err, ExtractorError::MalformedInput(_)));
        assert!(map_ner_label("").is_err());
    }

    #[test]
    fn test_review_labels_are_zero_based() {
        assert_eq!(map_review_label(5.0).unwrap(), 4);
        assert_eq!(map_review_label(1.0).unwrap(), 0);
        assert_eq!(map_review_label(3.7).unwrap(), 2);
        assert!(map_review_label(0.0).is_err());
        assert!(map_review_label(6.0).is_err());
    }

    #[test]
    fn test_repeat_first_labels_every_subword() {
        // [CLS] japan ##ese win [SEP] [PAD]
        let word_ids = [None, Some(0), Some(0), Some(1), None, None];
        let aligned = align_labels(&word_ids, &[5, 9], SubwordLabelPolicy::RepeatFirst).unwrap();
        assert_eq!(aligned, vec![-100, 5, 5, 9, -100, -100]);
    }

    #[test]
    fn test_mask_continuation_keeps_first_subword_only() {
        let word_ids = [None, Some(0), Some(0), Some(1), None, None];
        let aligned =
            align_labels(&word_ids, &[5, 9], SubwordLabelPolicy::MaskContinuation).unwrap();
        assert_eq!(aligned, vec![-100, 5, -100, 9, -100, -100]);

        let labelled = aligned.iter().filter(|l| **l != SPECIAL_TOKEN_LABEL).count();
        let distinct: HashSet<u32> = word_ids.iter().flatten().copied().collect();
        assert_eq!(labelled, distinct.len());
    }

    #[test]
    fn test_word_index_out_of_range() {
        let err = align_labels(&[Some(3)], &[9], SubwordLabelPolicy::RepeatFirst).unwrap_err();
        assert!(matches!(err, ExtractorError::MalformedInput(_)));
    }
}
