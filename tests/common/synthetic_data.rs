use pixel_forest::{Image, ImageSet, BACKGROUND_CLASS_LABEL};

/// Builds a sample whose image and per-pixel labels are both constant.
pub fn uniform_set(width: usize, height: usize, pixel: u8, label: u8, codex: u8) -> ImageSet {
    ImageSet {
        image: Image::from_raw(width, height, vec![pixel; width * height]),
        label: Image::from_raw(width, height, vec![label; width * height]),
        codex,
    }
}

/// Sample with a bright top half and dark bottom half; every pixel
/// carries `label`. The intra-image contrast gives offset-comparison
/// learners something to latch onto.
pub fn banded_set(width: usize, height: usize, label: u8, codex: u8) -> ImageSet {
    let mut image = Image::new(width, height);
    let mut label_map = Image::new(width, height);
    for y in 0..height {
        for x in 0..width {
            image.set(x, y, if y < height / 2 { 255 } else { 0 });
            label_map.set(x, y, label);
        }
    }
    ImageSet {
        image,
        label: label_map,
        codex,
    }
}

/// 3x3 sample with one bright pixel in the center labelled `digit`;
/// every other pixel is background.
pub fn lone_pixel_set(digit: u8) -> ImageSet {
    let mut image = Image::new(3, 3);
    let mut label = Image::new(3, 3);
    for y in 0..3 {
        for x in 0..3 {
            label.set(x, y, BACKGROUND_CLASS_LABEL);
        }
    }
    image.set(1, 1, 255);
    label.set(1, 1, digit);
    ImageSet {
        image,
        label,
        codex: digit,
    }
}
