//! Decision-tree training over per-pixel samples.

mod node;

pub use node::DecisionNode;

use crate::error::{ForestError, Result};
use crate::histogram::Histogram;
use crate::image::{Image, ImageSet};
use crate::rng::TrainingRng;
use log::debug;
use serde::Deserialize;
use std::time::Instant;

/// Per-tree training parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecisionTreeParams {
    /// Maximum depth for any decision tree.
    pub max_tree_depth: u32,
    /// How many random split candidates to evaluate per node.
    pub node_trial_count: u32,
    /// How many distinct label values there are, including the
    /// background class. 0 asks the driver to detect it from the
    /// dataset; training itself rejects 0.
    pub class_count: u32,
    /// Half-range of the offset distribution probed by split functions.
    pub visual_search_radius: u32,
    /// Minimum number of samples required to attempt a split.
    pub min_sample_count: u32,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_tree_depth: 20,
            node_trial_count: 1200,
            class_count: 0,
            visual_search_radius: 20,
            min_sample_count: 2,
        }
    }
}

/// Borrowed reference to one training pixel. Exists only while a tree
/// is being trained; no image data is copied.
#[derive(Clone, Copy)]
pub(crate) struct TrainSet<'a> {
    pub source: &'a ImageSet,
    pub x: usize,
    pub y: usize,
}

/// A trained decision tree and the parameters that shaped it.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    params: DecisionTreeParams,
    root: DecisionNode,
}

impl DecisionTree {
    /// Trains a tree on `count` images of `dataset` starting at
    /// `start`, wrapping around the end of the dataset. Every pixel of
    /// every selected image becomes one training sample.
    pub fn train(
        params: &DecisionTreeParams,
        dataset: &[ImageSet],
        start: usize,
        count: usize,
        rng: &mut TrainingRng,
    ) -> Result<DecisionTree> {
        if dataset.is_empty() {
            return Err(ForestError::InvalidArgument(
                "training dataset is empty".to_string(),
            ));
        }
        if count > dataset.len() {
            return Err(ForestError::InvalidArgument(format!(
                "training count {count} exceeds dataset size {}",
                dataset.len()
            )));
        }
        if params.class_count == 0 {
            return Err(ForestError::InvalidArgument(
                "class count must be nonzero (0 is reserved for detection by the driver)"
                    .to_string(),
            ));
        }

        let started = Instant::now();
        let width = dataset[0].image.width();
        let height = dataset[0].image.height();

        let mut initial_histogram = Histogram::new(params.class_count as usize);
        // The dominant allocation in the system: one entry per pixel of
        // every selected image.
        let mut samples: Vec<TrainSet<'_>> = Vec::with_capacity(count * width * height);

        for i in 0..count {
            let set = &dataset[(start + i) % dataset.len()];
            if set.image.width() != set.label.width() || set.image.height() != set.label.height() {
                return Err(ForestError::InvalidArgument(format!(
                    "image {}x{} does not match label map {}x{}",
                    set.image.width(),
                    set.image.height(),
                    set.label.width(),
                    set.label.height()
                )));
            }
            for y in 0..set.label.height() {
                for x in 0..set.label.width() {
                    samples.push(TrainSet { source: set, x, y });
                    initial_histogram.increment(usize::from(set.label.get(x, y)));
                }
            }
        }

        debug!(
            "DecisionTree::train materialized {} samples from {} images",
            samples.len(),
            count
        );

        let root = DecisionNode::train(params, 0, samples, initial_histogram, rng);

        debug!(
            "DecisionTree::train finished in {:.3} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(DecisionTree {
            params: *params,
            root,
        })
    }

    pub(crate) fn from_parts(params: DecisionTreeParams, root: DecisionNode) -> Self {
        DecisionTree { params, root }
    }

    /// Parameters the tree was trained with.
    pub fn params(&self) -> &DecisionTreeParams {
        &self.params
    }

    /// Root of the trained tree.
    pub fn root(&self) -> &DecisionNode {
        &self.root
    }

    /// Class distribution of the leaf that `(x, y)` of `image` routes to.
    pub fn classify_pixel(&self, x: usize, y: usize, image: &Image) -> &Histogram {
        self.root.classify(x, y, image)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionNode, DecisionTree, DecisionTreeParams};
    use crate::histogram::Histogram;
    use crate::image::{Image, ImageSet};
    use crate::rng::TrainingRng;

    fn constant_set(width: usize, height: usize, pixel: u8, label: u8) -> ImageSet {
        let image = Image::from_raw(width, height, vec![pixel; width * height]);
        let label = Image::from_raw(width, height, vec![label; width * height]);
        ImageSet {
            image,
            label,
            codex: 0,
        }
    }

    /// Image with a bright top half and dark bottom half, labelled 0 on
    /// top and 1 below, so a tree has something to learn.
    fn banded_set(width: usize, height: usize) -> ImageSet {
        let mut image = Image::new(width, height);
        let mut label = Image::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let top = y < height / 2;
                image.set(x, y, if top { 230 } else { 20 });
                label.set(x, y, u8::from(!top));
            }
        }
        ImageSet {
            image,
            label,
            codex: 0,
        }
    }

    fn params(class_count: u32) -> DecisionTreeParams {
        DecisionTreeParams {
            max_tree_depth: 6,
            node_trial_count: 200,
            class_count,
            visual_search_radius: 2,
            min_sample_count: 1,
        }
    }

    fn leaf_population(node: &DecisionNode, class_count: usize) -> u64 {
        match node {
            DecisionNode::Leaf { histogram } => {
                assert_eq!(histogram.class_count(), class_count);
                histogram.sample_total()
            }
            DecisionNode::Internal {
                left,
                right,
                histogram,
                ..
            } => {
                assert_eq!(histogram.class_count(), class_count);
                leaf_population(left, class_count) + leaf_population(right, class_count)
            }
        }
    }

    #[test]
    fn uniform_labels_collapse_to_a_root_leaf() {
        let dataset = vec![constant_set(4, 4, 255, 7)];
        let mut rng = TrainingRng::seeded(1);
        let tree_params = DecisionTreeParams {
            max_tree_depth: 5,
            node_trial_count: 1,
            class_count: 11,
            visual_search_radius: 1,
            min_sample_count: 1,
        };
        let tree = DecisionTree::train(&tree_params, &dataset, 0, 1, &mut rng).unwrap();

        match tree.root() {
            DecisionNode::Leaf { histogram } => {
                assert_eq!(histogram.sample_total(), 16);
                assert_eq!(histogram.class_total(7), 16);
                for class in (0..11).filter(|&c| c != 7) {
                    assert_eq!(histogram.class_total(class), 0);
                }
            }
            DecisionNode::Internal { .. } => panic!("zero-entropy dataset must train to a leaf"),
        }
    }

    #[test]
    fn leaves_partition_the_sample_population() {
        let dataset = vec![banded_set(4, 4)];
        let mut rng = TrainingRng::seeded(3);
        let tree = DecisionTree::train(&params(2), &dataset, 0, 1, &mut rng).unwrap();

        assert_eq!(tree.root().histogram().sample_total(), 16);
        assert_eq!(leaf_population(tree.root(), 2), 16);
    }

    #[test]
    fn classification_routes_to_the_training_distribution() {
        let dataset = vec![banded_set(4, 4)];
        let mut rng = TrainingRng::seeded(8);
        let tree = DecisionTree::train(&params(2), &dataset, 0, 1, &mut rng).unwrap();

        // The banded image separates cleanly well before the depth cap,
        // so each pixel's leaf is dominated by its own band.
        let image = &dataset[0].image;
        for y in 0..4 {
            for x in 0..4 {
                let hist = tree.classify_pixel(x, y, image);
                let expected = usize::from(y >= 2);
                assert_eq!(
                    hist.dominant_class(),
                    expected,
                    "pixel ({x},{y}) classified into {hist:?}"
                );
            }
        }
    }

    #[test]
    fn modular_wrap_revisits_the_dataset_from_any_start() {
        let dataset = vec![banded_set(4, 4), constant_set(4, 4, 0, 1)];
        let mut rng = TrainingRng::seeded(5);
        // start beyond the end wraps: trains on sets 1 and 0.
        let tree = DecisionTree::train(&params(2), &dataset, 1, 2, &mut rng).unwrap();
        assert_eq!(tree.root().histogram().sample_total(), 32);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let mut rng = TrainingRng::seeded(0);
        let err = DecisionTree::train(&params(2), &[], 0, 0, &mut rng).unwrap_err();
        assert!(err.to_string().contains("invalid argument"));
    }

    #[test]
    fn oversized_count_is_rejected() {
        let dataset = vec![constant_set(2, 2, 0, 0)];
        let mut rng = TrainingRng::seeded(0);
        assert!(DecisionTree::train(&params(2), &dataset, 0, 2, &mut rng).is_err());
    }

    #[test]
    fn mismatched_label_dimensions_are_rejected() {
        let set = ImageSet {
            image: Image::new(3, 3),
            label: Image::new(2, 3),
            codex: 0,
        };
        let mut rng = TrainingRng::seeded(0);
        let err = DecisionTree::train(&params(2), &[set], 0, 1, &mut rng).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn zero_trials_fall_back_to_a_leaf() {
        let dataset = vec![banded_set(4, 4)];
        let mut rng = TrainingRng::seeded(2);
        let tree_params = DecisionTreeParams {
            node_trial_count: 0,
            ..params(2)
        };
        let tree = DecisionTree::train(&tree_params, &dataset, 0, 1, &mut rng).unwrap();
        assert!(matches!(tree.root(), DecisionNode::Leaf { .. }));
    }

    #[test]
    fn root_histogram_counts_every_label() {
        let dataset = vec![banded_set(4, 4)];
        let mut rng = TrainingRng::seeded(9);
        let tree = DecisionTree::train(&params(2), &dataset, 0, 1, &mut rng).unwrap();
        let root = tree.root().histogram();
        assert_eq!(root.class_total(0), 8);
        assert_eq!(root.class_total(1), 8);
        assert_eq!(Histogram::new(2).class_count(), root.class_count());
    }
}
