// Разбиение на обучающую и валидационную части. Разбиение строится по случайной перестановке
// с фиксированным зерном, поэтому два запуска на одних и тех же данных дают одинаковые части.
// Делятся индексы, а не сами данные, так что предложения, кодировки и метки остаются
// согласованными.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Зерно перестановки для разбиения
pub const SPLIT_SEED: u64 = 2020;

/// Индексы обучающей и валидационной частей
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Перемешивает `0..len` с зерном `seed` и делит на две части.
///
/// Валидационная часть содержит `ceil(len * validation_fraction)` индексов,
/// но не больше `len`.
pub fn split_indices(len: usize, validation_fraction: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let validation_len = ((len as f64) * validation_fraction).ceil() as usize;
    let validation_len = validation_len.min(len);

    let validation = indices.split_off(len - validation_len);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        indices.len(),
        validation.len()
    );

    SplitIndices {
        train: indices,
        validation,
    }
}

/// Забирает из `items` элементы по индексам `indices` в порядке индексов
pub fn take_indices<T>(items: &mut [Option<T>], indices: &[usize]) -> Vec<T> {
    indices.iter().filter_map(|&i| items[i].take()).collect()
}
