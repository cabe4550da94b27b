// Модуль определяет структуру TokenizedBatcher, которая упаковывает элементы TokenizedItem
// в тензоры burn. Элементы уже дополнены до общей длины, поэтому упаковка сводится к
// складыванию строк: идентификаторы токенов, маска заполнения, полученная из маски внимания,
// и по одной строке меток на элемент ([batch, 1] для классификации последовательностей,
// [batch, max_length] для классификации токенов).

use super::dataset::TokenizedItem;
use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Bool, Data, ElementConversion, Int, Shape, Tensor},
};
use derive_new::new;

/// Структура для упаковки токенизированных элементов в тензоры на устройстве `device`
#[derive(new, Clone, Debug)]
pub struct TokenizedBatcher<B: Backend> {
    device: B::Device, // Вычислительное устройство для создания тензоров
}

/// Структура для пакета закодированных примеров
#[derive(Debug, Clone, new)]
pub struct TokenizedTrainingBatch<B: Backend> {
    pub tokens: Tensor<B, 2, Int>,         // Идентификаторы токенов
    pub attention_mask: Tensor<B, 2, Int>, // 1 для настоящих токенов, 0 для заполнения
    pub mask_pad: Tensor<B, 2, Bool>,      // Маска заполнения для токенизированного текста
    pub labels: Tensor<B, 2, Int>,         // Строки меток, -100 там, где метка не нужна
}

impl<B: Backend> TokenizedBatcher<B> {
    /// Складывает строки одинаковой длины в двумерный тензор
    fn stack<T: Copy>(&self, rows: Vec<&[T]>, convert: impl Fn(T) -> i64) -> Tensor<B, 2, Int> {
        let batch_size = rows.len();
        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        let values: Vec<B::IntElem> = rows
            .iter()
            .flat_map(|row| row.iter().map(|value| convert(*value).elem()))
            .collect();

        Tensor::from_data(Data::new(values, Shape::new([batch_size, width])), &self.device)
    }
}

/// Реализация Batcher для TokenizedBatcher
impl<B: Backend> Batcher<TokenizedItem, TokenizedTrainingBatch<B>> for TokenizedBatcher<B> {
    /// Создает пакет из вектора элементов
    fn batch(&self, items: Vec<TokenizedItem>) -> TokenizedTrainingBatch<B> {
        let tokens = self.stack(
            items.iter().map(|item| item.input_ids.as_slice()).collect(),
            i64::from,
        );
        let attention_mask = self.stack(
            items.iter().map(|item| item.attention_mask.as_slice()).collect(),
            i64::from,
        );
        let labels = self.stack(items.iter().map(|item| item.labels.as_slice()).collect(), |l| l);
        // Генерируем маску заполнения из маски внимания
        let mask_pad = attention_mask.clone().equal_elem(0);

        TokenizedTrainingBatch {
            tokens,
            attention_mask,
            mask_pad,
            labels,
        }
    }
}
