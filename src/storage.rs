//! Binary persistence of trained forests.
//!
//! The layout is fixed-width little-endian with no padding:
//!
//! ```text
//! u32 magic "FORT", u8 format version
//! forest params: u32 total_tree_count, u32 tree_training_percentage
//! tree params:   u32 max_tree_depth, u32 node_trial_count,
//!                u32 class_count, u32 visual_search_radius,
//!                u32 min_sample_count
//! per tree: tree params (repeated), then the node stream
//! ```
//!
//! Nodes stream in breadth-first order: the writer drains a FIFO seeded
//! with the root, emitting a `u8` tag per node (1 = leaf) followed by
//! the split function (internal) or the histogram (leaf), and enqueues
//! the children left then right. Internal histograms are not persisted.

use crate::error::{ForestError, Result};
use crate::forest::{DecisionForest, DecisionForestParams};
use crate::histogram::Histogram;
use crate::split::{SplitFunction, SplitOffset};
use crate::tree::{DecisionNode, DecisionTree, DecisionTreeParams};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const FOREST_MAGIC: u32 = 0x5452_4f46; // "FORT" in little-endian bytes
const FOREST_VERSION: u8 = 1;

/// Serializes `forest` to `path`. A failed write leaves the file in an
/// undefined state; there is no atomic-rename contract.
pub fn save_forest_file(path: &Path, forest: &DecisionForest) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_forest(&mut writer, forest)?;
    writer.flush()?;
    Ok(())
}

/// Reads a forest previously written by [`save_forest_file`].
pub fn load_forest_file(path: &Path) -> Result<DecisionForest> {
    let mut reader = BufReader::new(File::open(path)?);
    load_forest(&mut reader)
}

/// Writes `forest` to any byte sink.
pub fn save_forest<W: Write>(out: &mut W, forest: &DecisionForest) -> Result<()> {
    write_u32(out, FOREST_MAGIC)?;
    write_u8(out, FOREST_VERSION)?;

    let forest_params = forest.forest_params();
    write_u32(out, forest_params.total_tree_count)?;
    write_u32(out, forest_params.tree_training_percentage)?;
    save_tree_params(out, forest.tree_params())?;

    for tree in forest.trees() {
        save_tree(out, tree)?;
    }
    Ok(())
}

/// Reads a forest from any byte source.
pub fn load_forest<R: Read>(input: &mut R) -> Result<DecisionForest> {
    let magic = read_u32(input)?;
    if magic != FOREST_MAGIC {
        return Err(ForestError::BadMagic {
            found: magic,
            expected: FOREST_MAGIC,
        });
    }
    let version = read_u8(input)?;
    if version != FOREST_VERSION {
        return Err(ForestError::InvalidData(format!(
            "unsupported forest format version {version}"
        )));
    }

    let forest_params = DecisionForestParams {
        total_tree_count: read_u32(input)?,
        tree_training_percentage: read_u32(input)?,
    };
    let tree_params = load_tree_params(input)?;

    let mut trees = Vec::new();
    for _ in 0..forest_params.total_tree_count {
        trees.push(load_tree(input)?);
    }

    Ok(DecisionForest::from_parts(forest_params, tree_params, trees))
}

fn save_tree_params<W: Write>(out: &mut W, params: &DecisionTreeParams) -> Result<()> {
    write_u32(out, params.max_tree_depth)?;
    write_u32(out, params.node_trial_count)?;
    write_u32(out, params.class_count)?;
    write_u32(out, params.visual_search_radius)?;
    write_u32(out, params.min_sample_count)?;
    Ok(())
}

fn load_tree_params<R: Read>(input: &mut R) -> Result<DecisionTreeParams> {
    Ok(DecisionTreeParams {
        max_tree_depth: read_u32(input)?,
        node_trial_count: read_u32(input)?,
        class_count: read_u32(input)?,
        visual_search_radius: read_u32(input)?,
        min_sample_count: read_u32(input)?,
    })
}

fn save_tree<W: Write>(out: &mut W, tree: &DecisionTree) -> Result<()> {
    save_tree_params(out, tree.params())?;

    let mut queue: VecDeque<&DecisionNode> = VecDeque::new();
    queue.push_back(tree.root());

    while let Some(node) = queue.pop_front() {
        match node {
            DecisionNode::Leaf { histogram } => {
                write_u8(out, 1)?;
                save_histogram(out, histogram)?;
            }
            DecisionNode::Internal {
                function,
                left,
                right,
                ..
            } => {
                write_u8(out, 0)?;
                save_split_function(out, function)?;
                queue.push_back(left);
                queue.push_back(right);
            }
        }
    }
    Ok(())
}

/// One decoded node of the breadth-first stream, before assembly.
enum NodeEntry {
    Internal(SplitFunction),
    Leaf(Histogram),
}

fn load_tree<R: Read>(input: &mut R) -> Result<DecisionTree> {
    let params = load_tree_params(input)?;

    // The stream is self-delimiting: every internal node promises two
    // more entries.
    let mut entries: Vec<NodeEntry> = Vec::new();
    let mut pending = 1usize;
    while pending > 0 {
        pending -= 1;
        match read_u8(input)? {
            0 => {
                entries.push(NodeEntry::Internal(load_split_function(input)?));
                pending += 2;
            }
            1 => entries.push(NodeEntry::Leaf(load_histogram(input)?)),
            tag => {
                return Err(ForestError::InvalidData(format!(
                    "unknown decision node tag {tag}"
                )))
            }
        }
    }

    // Children of the k-th internal entry were enqueued as stream
    // entries 1 + 2k and 2 + 2k.
    let mut internal_rank = Vec::with_capacity(entries.len());
    let mut internals_seen = 0usize;
    for entry in &entries {
        internal_rank.push(internals_seen);
        if matches!(entry, NodeEntry::Internal(_)) {
            internals_seen += 1;
        }
    }

    let mut slots: Vec<Option<NodeEntry>> = entries.into_iter().map(Some).collect();
    let root = assemble_node(&mut slots, &internal_rank, 0)?;
    Ok(DecisionTree::from_parts(params, root))
}

fn assemble_node(
    slots: &mut [Option<NodeEntry>],
    internal_rank: &[usize],
    index: usize,
) -> Result<DecisionNode> {
    let entry = slots
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| ForestError::InvalidData("inconsistent decision node stream".to_string()))?;

    match entry {
        NodeEntry::Leaf(histogram) => Ok(DecisionNode::Leaf { histogram }),
        NodeEntry::Internal(function) => {
            let rank = internal_rank[index];
            let left = assemble_node(slots, internal_rank, 1 + 2 * rank)?;
            let right = assemble_node(slots, internal_rank, 2 + 2 * rank)?;
            Ok(DecisionNode::Internal {
                function,
                histogram: Histogram::default(),
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}

fn save_split_function<W: Write>(out: &mut W, function: &SplitFunction) -> Result<()> {
    write_u32(out, function.offsets().len() as u32)?;
    for offset in function.offsets() {
        write_i32(out, offset.x)?;
        write_i32(out, offset.y)?;
    }
    Ok(())
}

fn load_split_function<R: Read>(input: &mut R) -> Result<SplitFunction> {
    let count = read_u32(input)?;
    // Training only ever produces one or two offsets.
    if count > 2 {
        return Err(ForestError::InvalidData(format!(
            "split function with {count} offsets"
        )));
    }
    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let x = read_i32(input)?;
        let y = read_i32(input)?;
        offsets.push(SplitOffset { x, y });
    }
    Ok(SplitFunction::from_offsets(offsets))
}

fn save_histogram<W: Write>(out: &mut W, histogram: &Histogram) -> Result<()> {
    write_u64(out, histogram.sample_total())?;
    write_u32(out, histogram.class_count() as u32)?;
    for &total in histogram.totals() {
        write_u32(out, total)?;
    }
    Ok(())
}

fn load_histogram<R: Read>(input: &mut R) -> Result<Histogram> {
    let sample_total = read_u64(input)?;
    let class_count = read_u32(input)?;
    let mut class_totals = Vec::new();
    for _ in 0..class_count {
        class_totals.push(read_u32(input)?);
    }
    Ok(Histogram::from_parts(sample_total, class_totals))
}

fn write_u8<W: Write>(out: &mut W, value: u8) -> io::Result<()> {
    out.write_all(&[value])
}

fn write_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn write_i32<W: Write>(out: &mut W, value: i32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn write_u64<W: Write>(out: &mut W, value: u64) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn read_u8<R: Read>(input: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(input: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(input: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
