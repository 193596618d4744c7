//! Parallel training of a forest of decision trees and vote
//! aggregation at classification time.

use crate::error::{ForestError, Result};
use crate::histogram::Histogram;
use crate::image::{Image, ImageSet, BACKGROUND_CLASS_LABEL};
use crate::rng::{clock_seed, mixed_seed, TrainingRng};
use crate::tree::{DecisionTree, DecisionTreeParams};
use log::{debug, info};
use rayon::prelude::*;
use serde::Deserialize;
use std::thread;
use std::time::Instant;

/// Forest-wide training parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecisionForestParams {
    /// How many trees to assemble in the forest.
    pub total_tree_count: u32,
    /// Percentage of the dataset sampled by each tree.
    pub tree_training_percentage: u32,
}

impl Default for DecisionForestParams {
    fn default() -> Self {
        Self {
            total_tree_count: 18,
            tree_training_percentage: 80,
        }
    }
}

/// A forest of independently trained decision trees that classify
/// images pixel by pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionForest {
    forest_params: DecisionForestParams,
    tree_params: DecisionTreeParams,
    trees: Vec<DecisionTree>,
}

impl DecisionForest {
    /// Trains a forest, seeding every tree from the wall clock. Results
    /// vary run to run; use [`DecisionForest::train_with_seed`] for
    /// reproducible forests.
    pub fn train(
        forest_params: &DecisionForestParams,
        tree_params: &DecisionTreeParams,
        dataset: &[ImageSet],
    ) -> Result<DecisionForest> {
        Self::train_with_seed(forest_params, tree_params, dataset, clock_seed())
    }

    /// Trains a forest deterministically from `base_seed`. The tree
    /// index is folded into the seed so every tree draws a distinct
    /// split-candidate sequence.
    ///
    /// Trees are trained in parallel; a failed tree does not cancel its
    /// siblings, and the first failure is surfaced after all workers
    /// have joined.
    pub fn train_with_seed(
        forest_params: &DecisionForestParams,
        tree_params: &DecisionTreeParams,
        dataset: &[ImageSet],
        base_seed: u64,
    ) -> Result<DecisionForest> {
        if dataset.is_empty() {
            return Err(ForestError::InvalidArgument(
                "training dataset is empty".to_string(),
            ));
        }
        if forest_params.total_tree_count == 0 || forest_params.tree_training_percentage == 0 {
            return Err(ForestError::InvalidArgument(
                "forest params require a nonzero tree count and training percentage".to_string(),
            ));
        }

        let total_tree_count = forest_params.total_tree_count as usize;
        let train_range = dataset.len() / total_tree_count;
        let train_count =
            forest_params.tree_training_percentage as usize * dataset.len() / 100;
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        info!(
            "DecisionForest::train {} trees, {} samples each, up to {} workers",
            total_tree_count, train_count, workers
        );
        let started = Instant::now();

        let outcomes: Vec<Result<DecisionTree>> = (0..total_tree_count)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = TrainingRng::seeded(mixed_seed(base_seed, tree_index as u64));
                let start = (tree_index % workers) * train_range;
                let tree_started = Instant::now();
                let tree = DecisionTree::train(tree_params, dataset, start, train_count, &mut rng);
                debug!(
                    "tree {} trained from offset {} in {:.3} ms",
                    tree_index,
                    start,
                    tree_started.elapsed().as_secs_f64() * 1000.0
                );
                tree
            })
            .collect();

        let trees = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

        info!(
            "DecisionForest::train finished in {:.3} s",
            started.elapsed().as_secs_f64()
        );

        Ok(DecisionForest {
            forest_params: *forest_params,
            tree_params: *tree_params,
            trees,
        })
    }

    pub(crate) fn from_parts(
        forest_params: DecisionForestParams,
        tree_params: DecisionTreeParams,
        trees: Vec<DecisionTree>,
    ) -> Self {
        DecisionForest {
            forest_params,
            tree_params,
            trees,
        }
    }

    /// Parameters the forest was trained with.
    pub fn forest_params(&self) -> &DecisionForestParams {
        &self.forest_params
    }

    /// Parameters each tree was trained with.
    pub fn tree_params(&self) -> &DecisionTreeParams {
        &self.tree_params
    }

    pub(crate) fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Sum of the per-tree leaf distributions for one pixel.
    fn pixel_histogram(&self, x: usize, y: usize, image: &Image) -> Histogram {
        let mut summed = Histogram::new(self.tree_params.class_count as usize);
        for tree in &self.trees {
            summed.merge(tree.classify_pixel(x, y, image));
        }
        summed
    }

    fn ensure_trained(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ForestError::InvalidArgument(
                "forest must be trained before it can classify".to_string(),
            ));
        }
        Ok(())
    }

    /// Labels every pixel of `input` with the dominant class of the
    /// summed tree votes, writing into `label_output`. The output must
    /// already match the input dimensions; nothing is written on a
    /// mismatch.
    pub fn classify_image(&self, input: &Image, label_output: &mut Image) -> Result<()> {
        if input.width() != label_output.width() || input.height() != label_output.height() {
            return Err(ForestError::InvalidArgument(format!(
                "input {}x{} does not match label output {}x{}",
                input.width(),
                input.height(),
                label_output.width(),
                label_output.height()
            )));
        }
        self.ensure_trained()?;

        for y in 0..input.height() {
            for x in 0..input.width() {
                let votes = self.pixel_histogram(x, y, input);
                label_output.set(x, y, votes.dominant_class() as u8);
            }
        }
        Ok(())
    }

    /// Classifies the whole image: each pixel's dominant class casts
    /// one vote into an image-level histogram, the background class is
    /// suppressed, and the dominant remaining class wins.
    ///
    /// The two voting stages are deliberate: the per-pixel dominant
    /// resolves tree disagreement, while the image-level histogram
    /// resolves pixel-location disagreement without letting the many
    /// background pixels swamp the sparse foreground ones.
    pub fn classify(&self, input: &Image) -> Result<u8> {
        self.ensure_trained()?;

        let mut image_result = Histogram::new(self.tree_params.class_count as usize);
        for y in 0..input.height() {
            for x in 0..input.width() {
                let votes = self.pixel_histogram(x, y, input);
                image_result.increment(votes.dominant_class());
            }
        }
        image_result.clear_class(usize::from(BACKGROUND_CLASS_LABEL));
        Ok(image_result.dominant_class() as u8)
    }
}
