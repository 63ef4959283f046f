//! In-memory datasets and the train/validation/test split

mod dataset;
mod split;

pub use dataset::Dataset;
pub use split::{train_val_test_split, DataSplit, SplitIndices, SplitRatios};
