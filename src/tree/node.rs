//! Recursive training and classification of a single tree node.

use crate::histogram::Histogram;
use crate::image::Image;
use crate::split::SplitFunction;
use crate::tree::{DecisionTreeParams, TrainSet};
use crate::rng::TrainingRng;

/// A binary tree node: internal nodes route queries through a split
/// function, leaves answer with the class distribution observed during
/// training.
///
/// Both variants retain the histogram the node was trained with; only
/// leaves consult theirs at classification time. The persisted format
/// stores histograms for leaves only, so internal nodes of a loaded
/// tree carry an empty one.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionNode {
    Leaf {
        histogram: Histogram,
    },
    Internal {
        function: SplitFunction,
        histogram: Histogram,
        left: Box<DecisionNode>,
        right: Box<DecisionNode>,
    },
}

/// Parent entropy minus the sample-weighted mean of the child
/// entropies. Counts are integers but the computation runs at float
/// precision.
fn information_gain(parent: &Histogram, left: &Histogram, right: &Histogram) -> f32 {
    let parent_total = parent.sample_total() as f32;
    parent.entropy()
        - (left.sample_total() as f32 / parent_total) * left.entropy()
        - (right.sample_total() as f32 / parent_total) * right.entropy()
}

impl DecisionNode {
    /// Trains this node from `samples`, whose class distribution is
    /// `histogram`. Runs `node_trial_count` random split candidates,
    /// keeps the best by information gain, and recurses into both
    /// partitions until a stopping rule fires.
    pub(crate) fn train(
        params: &DecisionTreeParams,
        depth: u32,
        samples: Vec<TrainSet<'_>>,
        histogram: Histogram,
        rng: &mut TrainingRng,
    ) -> DecisionNode {
        // Exit criteria: depth cap, thin or empty sample set, or a
        // sample set that is already of uniform class.
        if depth >= params.max_tree_depth
            || samples.is_empty()
            || samples.len() < params.min_sample_count as usize
        {
            return DecisionNode::Leaf { histogram };
        }

        let node_entropy = histogram.entropy();
        if node_entropy == 0.0 {
            return DecisionNode::Leaf { histogram };
        }

        let class_count = params.class_count as usize;
        let radius = params.visual_search_radius as i32;

        let mut best_gain = -1.0f32;
        let mut best: Option<Split<'_>> = None;

        for _ in 0..params.node_trial_count {
            let function = SplitFunction::random(radius, rng);
            let mut left_samples = Vec::with_capacity(samples.len());
            let mut right_samples = Vec::with_capacity(samples.len());
            let mut left_histogram = Histogram::new(class_count);
            let mut right_histogram = Histogram::new(class_count);

            // True goes right.
            for sample in &samples {
                let label = usize::from(sample.source.label.get(sample.x, sample.y));
                if function.evaluate(&sample.source.image, sample.x, sample.y) {
                    right_samples.push(*sample);
                    right_histogram.increment(label);
                } else {
                    left_samples.push(*sample);
                    left_histogram.increment(label);
                }
            }

            let gain = information_gain(&histogram, &left_histogram, &right_histogram);

            // `>=`, not `>`: an equally good later trial replaces the
            // earlier winner.
            if gain >= best_gain {
                best_gain = gain;
                best = Some(Split {
                    function,
                    left_samples,
                    right_samples,
                    left_histogram,
                    right_histogram,
                });
                // Gain equal to the node entropy means both partitions
                // are pure; no later trial can do better.
                if gain == node_entropy {
                    break;
                }
            }
        }

        let Some(split) = best else {
            // Zero configured trials: nothing to split on.
            return DecisionNode::Leaf { histogram };
        };

        let left = Self::train(
            params,
            depth + 1,
            split.left_samples,
            split.left_histogram,
            rng,
        );
        let right = Self::train(
            params,
            depth + 1,
            split.right_samples,
            split.right_histogram,
            rng,
        );

        DecisionNode::Internal {
            function: split.function,
            histogram,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Routes `(x, y)` of `image` down to a leaf and returns the class
    /// distribution recorded there.
    pub fn classify<'a>(&'a self, x: usize, y: usize, image: &Image) -> &'a Histogram {
        match self {
            DecisionNode::Leaf { histogram } => histogram,
            DecisionNode::Internal {
                function,
                left,
                right,
                ..
            } => {
                if function.evaluate(image, x, y) {
                    right.classify(x, y, image)
                } else {
                    left.classify(x, y, image)
                }
            }
        }
    }

    /// Class distribution this node was trained with.
    pub fn histogram(&self) -> &Histogram {
        match self {
            DecisionNode::Leaf { histogram } => histogram,
            DecisionNode::Internal { histogram, .. } => histogram,
        }
    }
}

/// Outcome of one node trial, kept while it leads the gain ranking.
struct Split<'a> {
    function: SplitFunction,
    left_samples: Vec<TrainSet<'a>>,
    right_samples: Vec<TrainSet<'a>>,
    left_histogram: Histogram,
    right_histogram: Histogram,
}
