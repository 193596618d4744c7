#![doc = include_str!("../README.md")]

// Core learning engine.
pub mod error;
pub mod forest;
pub mod histogram;
pub mod image;
pub mod split;
pub mod tree;

// Collaborators: randomness, dataset loading, persistence, runtime wiring.
pub mod config;
pub mod mnist;
pub mod rng;
pub mod storage;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{ForestError, Result};
pub use crate::forest::{DecisionForest, DecisionForestParams};
pub use crate::histogram::Histogram;
pub use crate::image::{Image, ImageSet, BACKGROUND_CLASS_LABEL};
pub use crate::storage::{load_forest_file, save_forest_file};
pub use crate::tree::{DecisionTree, DecisionTreeParams};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use pixel_forest::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> pixel_forest::Result<()> {
/// let (dataset, class_count) = pixel_forest::mnist::load_image_sets(
///     Path::new("train-images.idx3-ubyte"),
///     Path::new("train-labels.idx1-ubyte"),
/// )?;
///
/// let tree_params = DecisionTreeParams {
///     class_count,
///     ..Default::default()
/// };
/// let forest = DecisionForest::train(&DecisionForestParams::default(), &tree_params, &dataset)?;
/// println!("first sample classifies as {}", forest.classify(&dataset[0].image)?);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::forest::{DecisionForest, DecisionForestParams};
    pub use crate::image::{Image, ImageSet, BACKGROUND_CLASS_LABEL};
    pub use crate::storage::{load_forest_file, save_forest_file};
    pub use crate::tree::{DecisionTree, DecisionTreeParams};
}
