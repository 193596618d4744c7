//! MNIST IDX dataset loading and per-pixel label lifting.
//!
//! The IDX headers are big-endian; payloads are raw 8-bit samples. The
//! scalar digit of each sample is lifted into per-pixel supervision:
//! nonzero pixels carry the digit, zero pixels carry the background
//! class.

use crate::error::{ForestError, Result};
use crate::image::{Image, ImageSet, BACKGROUND_CLASS_LABEL};
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::multi::count;
use nom::number::complete::be_u32;
use nom::sequence::tuple;
use nom::IResult;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Magic number opening an IDX image file.
const IMAGE_MAGIC: u32 = 2051;
/// Magic number opening an IDX label file.
const LABEL_MAGIC: u32 = 2049;

/// Default MNIST file names used by the command-line driver.
pub const TRAINING_IMAGES: &str = "train-images.idx3-ubyte";
pub const TRAINING_LABELS: &str = "train-labels.idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images.idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels.idx1-ubyte";

#[derive(Debug, Clone, Copy)]
struct ImageFileHeader {
    magic: u32,
    image_count: u32,
    rows: u32,
    columns: u32,
}

#[derive(Debug, Clone, Copy)]
struct LabelFileHeader {
    magic: u32,
    label_count: u32,
}

fn parse_image_header(input: &[u8]) -> IResult<&[u8], ImageFileHeader> {
    map(
        tuple((be_u32, be_u32, be_u32, be_u32)),
        |(magic, image_count, rows, columns)| ImageFileHeader {
            magic,
            image_count,
            rows,
            columns,
        },
    )(input)
}

fn parse_label_header(input: &[u8]) -> IResult<&[u8], LabelFileHeader> {
    map(tuple((be_u32, be_u32)), |(magic, label_count)| {
        LabelFileHeader { magic, label_count }
    })(input)
}

fn parse_image_payload<'a>(
    input: &'a [u8],
    header: &ImageFileHeader,
) -> IResult<&'a [u8], Vec<Vec<u8>>> {
    let pixels = header.rows as usize * header.columns as usize;
    count(map(take(pixels), Vec::from), header.image_count as usize)(input)
}

fn parse_label_payload<'a>(input: &'a [u8], header: &LabelFileHeader) -> IResult<&'a [u8], Vec<u8>> {
    map(take(header.label_count as usize), Vec::from)(input)
}

/// Loads an MNIST image/label file pair from disk. See
/// [`decode_image_sets`] for the decoding contract.
pub fn load_image_sets(images_path: &Path, labels_path: &Path) -> Result<(Vec<ImageSet>, u32)> {
    let image_bytes = fs::read(images_path)?;
    let label_bytes = fs::read(labels_path)?;
    decode_image_sets(&image_bytes, &label_bytes)
}

/// Decodes an MNIST image/label byte pair into per-pixel labelled
/// [`ImageSet`]s, returning them together with the number of distinct
/// label values observed (the background class included).
pub fn decode_image_sets(image_bytes: &[u8], label_bytes: &[u8]) -> Result<(Vec<ImageSet>, u32)> {
    let (image_rest, image_header) = parse_image_header(image_bytes)
        .map_err(|_| ForestError::InvalidData("malformed MNIST image header".to_string()))?;
    let (label_rest, label_header) = parse_label_header(label_bytes)
        .map_err(|_| ForestError::InvalidData("malformed MNIST label header".to_string()))?;

    if image_header.magic != IMAGE_MAGIC {
        return Err(ForestError::BadMagic {
            found: image_header.magic,
            expected: IMAGE_MAGIC,
        });
    }
    if label_header.magic != LABEL_MAGIC {
        return Err(ForestError::BadMagic {
            found: label_header.magic,
            expected: LABEL_MAGIC,
        });
    }
    if image_header.image_count != label_header.label_count {
        return Err(ForestError::SampleCountMismatch {
            images: image_header.image_count,
            labels: label_header.label_count,
        });
    }
    if image_header.rows == 0 || image_header.columns == 0 {
        return Err(ForestError::InvalidData(
            "MNIST image file declares zero-sized images".to_string(),
        ));
    }

    let (_, images) = parse_image_payload(image_rest, &image_header)
        .map_err(|_| ForestError::InvalidData("truncated MNIST image data".to_string()))?;
    let (_, labels) = parse_label_payload(label_rest, &label_header)
        .map_err(|_| ForestError::InvalidData("truncated MNIST label data".to_string()))?;

    let width = image_header.columns as usize;
    let height = image_header.rows as usize;

    let mut labels_seen = BTreeSet::new();
    let sets = images
        .into_iter()
        .zip(labels)
        .map(|(pixels, digit)| {
            let image = Image::from_raw(width, height, pixels);
            let mut label = Image::new(width, height);
            for y in 0..height {
                for x in 0..width {
                    let value = if image.get(x, y) != 0 {
                        digit
                    } else {
                        BACKGROUND_CLASS_LABEL
                    };
                    label.set(x, y, value);
                    labels_seen.insert(value);
                }
            }
            ImageSet {
                image,
                label,
                codex: digit,
            }
        })
        .collect();

    Ok((sets, labels_seen.len() as u32))
}
