mod common;

use common::synthetic_data::{banded_set, lone_pixel_set, uniform_set};
use pixel_forest::image::io::{load_grayscale_image, save_grayscale_image, save_label_map};
use pixel_forest::rng::TrainingRng;
use pixel_forest::storage::{load_forest_file, save_forest, save_forest_file};
use pixel_forest::tree::DecisionNode;
use pixel_forest::{
    DecisionForest, DecisionForestParams, DecisionTree, DecisionTreeParams, Image,
};

fn tree_params(class_count: u32) -> DecisionTreeParams {
    DecisionTreeParams {
        max_tree_depth: 6,
        node_trial_count: 200,
        class_count,
        visual_search_radius: 1,
        min_sample_count: 1,
    }
}

fn forest_params(total_tree_count: u32) -> DecisionForestParams {
    DecisionForestParams {
        total_tree_count,
        tree_training_percentage: 100,
    }
}

#[test]
fn uniform_dataset_short_circuits_to_a_root_leaf() {
    let dataset = vec![uniform_set(4, 4, 255, 7, 7)];
    let params = DecisionTreeParams {
        max_tree_depth: 5,
        node_trial_count: 1,
        class_count: 11,
        visual_search_radius: 1,
        min_sample_count: 1,
    };
    let mut rng = TrainingRng::seeded(1);
    let tree = DecisionTree::train(&params, &dataset, 0, 1, &mut rng).unwrap();

    match tree.root() {
        DecisionNode::Leaf { histogram } => {
            assert_eq!(histogram.class_total(7), 16);
            assert_eq!(histogram.sample_total(), 16);
        }
        DecisionNode::Internal { .. } => {
            panic!("a zero-entropy dataset must leave the root a leaf")
        }
    }
}

#[test]
fn textured_and_flat_classes_separate() {
    // A carries intra-image contrast, B is featureless; every split
    // compares two pixels of the same query image, so the learner keys
    // on A's contrast and routes all of B down the constant-false path.
    let a = banded_set(2, 2, 0, 0);
    let b = uniform_set(2, 2, 128, 1, 1);
    let dataset = vec![a, b];

    let forest =
        DecisionForest::train_with_seed(&forest_params(1), &tree_params(2), &dataset, 7).unwrap();

    assert_eq!(forest.classify(&dataset[0].image).unwrap(), 0);
    assert_eq!(forest.classify(&dataset[1].image).unwrap(), 1);
}

#[test]
fn background_class_is_suppressed_in_the_image_vote() {
    // Eight of nine pixels are background; the lone foreground pixel
    // must still decide the image-level class.
    let dataset = vec![lone_pixel_set(5)];
    let params = DecisionTreeParams {
        max_tree_depth: 5,
        ..tree_params(11)
    };

    let forest =
        DecisionForest::train_with_seed(&forest_params(1), &params, &dataset, 21).unwrap();

    assert_eq!(forest.classify(&dataset[0].image).unwrap(), 5);

    // The raw label map still reports the background class everywhere
    // except the foreground pixel.
    let mut labels = Image::new(3, 3);
    forest
        .classify_image(&dataset[0].image, &mut labels)
        .unwrap();
    assert_eq!(labels.get(1, 1), 5);
    assert_eq!(labels.get(0, 0), 10);
}

#[test]
fn saved_forest_classifies_identically_after_reload() {
    let dataset = vec![banded_set(2, 2, 0, 0), uniform_set(2, 2, 128, 1, 1)];
    let forest =
        DecisionForest::train_with_seed(&forest_params(3), &tree_params(2), &dataset, 13).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digits.forest");
    save_forest_file(&path, &forest).unwrap();
    let loaded = load_forest_file(&path).unwrap();

    assert_eq!(loaded.forest_params(), forest.forest_params());
    assert_eq!(loaded.tree_params(), forest.tree_params());
    for set in &dataset {
        assert_eq!(
            loaded.classify(&set.image).unwrap(),
            forest.classify(&set.image).unwrap()
        );
    }

    let mut original_bytes = Vec::new();
    save_forest(&mut original_bytes, &forest).unwrap();
    let mut reloaded_bytes = Vec::new();
    save_forest(&mut reloaded_bytes, &loaded).unwrap();
    assert_eq!(original_bytes, reloaded_bytes);
}

#[test]
fn every_trained_tree_partitions_its_samples_across_leaves() {
    fn leaf_population(node: &DecisionNode) -> u64 {
        match node {
            DecisionNode::Leaf { histogram } => histogram.sample_total(),
            DecisionNode::Internal { left, right, .. } => {
                leaf_population(left) + leaf_population(right)
            }
        }
    }

    let dataset = vec![banded_set(2, 2, 0, 0), uniform_set(2, 2, 128, 1, 1)];
    let mut rng = TrainingRng::seeded(17);
    let tree = DecisionTree::train(&tree_params(2), &dataset, 0, 2, &mut rng).unwrap();

    assert_eq!(tree.root().histogram().sample_total(), 8);
    assert_eq!(leaf_population(tree.root()), 8);
}

#[test]
fn label_map_survives_a_png_round_trip() {
    let dataset = vec![banded_set(2, 2, 0, 0), uniform_set(2, 2, 128, 1, 1)];
    let forest =
        DecisionForest::train_with_seed(&forest_params(1), &tree_params(2), &dataset, 7).unwrap();

    let mut labels = Image::new(2, 2);
    forest
        .classify_image(&dataset[1].image, &mut labels)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.png");
    save_label_map(&labels, 2, &path).unwrap();
    let reloaded = load_grayscale_image(&path).unwrap();

    // With two classes the map is stretched to {0, 255}.
    for y in 0..2 {
        for x in 0..2 {
            let expected = u32::from(labels.get(x, y)) * 255;
            assert_eq!(u32::from(reloaded.get(x, y)), expected.min(255));
        }
    }

    // Raw grayscale output is byte-faithful.
    let gray_path = dir.path().join("input.png");
    save_grayscale_image(&dataset[1].image, &gray_path).unwrap();
    assert_eq!(load_grayscale_image(&gray_path).unwrap(), dataset[1].image);
}
