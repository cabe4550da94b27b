mod batcher;
mod dataset;
mod encoder;
mod labels;
mod splitter;
mod tokenizer;

pub use batcher::*;
pub use dataset::*;
pub use encoder::*;
pub use labels::*;
pub use splitter::*;
pub use tokenizer::*;

#[cfg(test)]
pub(crate) use tokenizer::test_support;
