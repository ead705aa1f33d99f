//! Score glyph reconstruction.
//!
//! The score digits are rendered in an italic font with uneven kerning, and
//! Tesseract reads them poorly as they are. Each digit is cut out as its own
//! connected component, the digits are pasted side by side onto a clean
//! canvas, and the canvas is sheared upright, padded, softened and
//! re-thresholded before recognition.

use image::imageops;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::binarize::BinaryMatrix;
use super::labeling::{LabelMatrix, BACKGROUND};

const PAPER: Luma<u8> = Luma([255]);

/// One connected component with its bounding box and own pixel mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabel {
    pub id: u32,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
    /// Pixels of this component only, relative to `(x_min, y_min)`.
    pub mask: BinaryMatrix,
}

impl ComponentLabel {
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }
}

/// Tuning for the reconstruction steps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphParams {
    /// Components shorter than this many pixels are speckle noise
    pub noise_height: u32,
    /// Paper between glyphs and around the assembled row
    pub margin: u32,
    /// Horizontal shear applied to undo the font's italic slant (dx per row)
    pub shear: f32,
    /// Uniform border added after shearing
    pub border: u32,
    /// Gaussian blur sigma; 0 disables the blur
    pub blur_sigma: f32,
    /// Re-threshold level after blurring
    pub threshold: u8,
}

impl Default for GlyphParams {
    fn default() -> Self {
        Self {
            noise_height: 15,
            margin: 5,
            shear: 0.11,
            border: 4,
            blur_sigma: 0.8,
            threshold: 128,
        }
    }
}

/// Measures every component in one pass over the label matrix.
///
/// The background label is skipped. Components come back ordered by
/// `x_min` then `y_min`, which is the reading order of the digits.
pub fn analyze_labels(labels: &LabelMatrix) -> Vec<ComponentLabel> {
    let count = labels.component_count() as usize;
    let mut bounds: Vec<Option<(u32, u32, u32, u32)>> = vec![None; count + 1];

    for y in 0..labels.height() {
        for x in 0..labels.width() {
            let label = labels.get(x, y);
            if label == BACKGROUND {
                continue;
            }
            let entry = &mut bounds[label as usize];
            *entry = Some(match *entry {
                Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
                None => (x, x, y, y),
            });
        }
    }

    let mut components: Vec<ComponentLabel> = bounds
        .into_iter()
        .enumerate()
        .filter_map(|(id, b)| b.map(|b| (id as u32, b)))
        .map(|(id, (x_min, x_max, y_min, y_max))| {
            let mask = BinaryMatrix::from_fn(x_max - x_min + 1, y_max - y_min + 1, |dx, dy| {
                labels.get(x_min + dx, y_min + dy) == id
            });
            ComponentLabel { id, x_min, x_max, y_min, y_max, mask }
        })
        .collect();

    components.sort_by_key(|c| (c.x_min, c.y_min));
    components
}

/// Drops components too short to be digits, keeping reading order.
pub fn filter_glyphs(components: Vec<ComponentLabel>, noise_height: u32) -> Vec<ComponentLabel> {
    components
        .into_iter()
        .filter(|c| c.height() >= noise_height)
        .collect()
}

/// Pastes glyphs left to right onto one canvas, bottom aligned.
///
/// The canvas is as tall as the tallest glyph plus `margin` above and below;
/// every glyph is followed by `margin` columns of paper. Returns `None` when
/// there is nothing to paste.
pub fn compose_glyphs(glyphs: &[ComponentLabel], margin: u32) -> Option<BinaryMatrix> {
    let max_height = glyphs.iter().map(ComponentLabel::height).max()?;
    let width = margin + glyphs.iter().map(|g| g.width() + margin).sum::<u32>();
    let height = max_height + margin * 2;

    let mut canvas = BinaryMatrix::new(width, height);
    let mut left = margin;
    for glyph in glyphs {
        let top = margin + (max_height - glyph.height());
        for dy in 0..glyph.height() {
            for dx in 0..glyph.width() {
                if glyph.mask.is_ink(dx, dy) {
                    canvas.set(left + dx, top + dy, true);
                }
            }
        }
        left += glyph.width() + margin;
    }

    Some(canvas)
}

/// Shears the canvas so the italic digits stand upright.
///
/// Row `y` moves right by `shear * y`, so with a positive shear the bottom
/// of a right-leaning glyph catches up with its top. The output is widened
/// so no ink is lost.
pub fn deskew(canvas: &GrayImage, shear: f32) -> GrayImage {
    if shear == 0.0 {
        return canvas.clone();
    }

    let extra = (shear.abs() * canvas.height().saturating_sub(1) as f32).ceil() as u32;
    let mut out: GrayImage = ImageBuffer::from_pixel(canvas.width() + extra, canvas.height(), PAPER);

    let offset = if shear < 0.0 { extra as f32 } else { 0.0 };
    match Projection::from_matrix([1.0, shear, offset, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]) {
        Some(projection) => warp_into(canvas, &projection, Interpolation::Nearest, PAPER, &mut out),
        None => imageops::overlay(&mut out, canvas, 0, 0),
    }
    out
}

/// Surrounds the image with `border` pixels of paper.
pub fn add_border(img: &GrayImage, border: u32) -> GrayImage {
    let mut out: GrayImage =
        ImageBuffer::from_pixel(img.width() + border * 2, img.height() + border * 2, PAPER);
    imageops::overlay(&mut out, img, border as i64, border as i64);
    out
}

/// Shear, pad, blur and re-threshold an assembled glyph row.
pub fn finish_canvas(canvas: &BinaryMatrix, params: &GlyphParams) -> GrayImage {
    let sheared = deskew(&canvas.to_image(), params.shear);
    let padded = add_border(&sheared, params.border);
    let softened = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(&padded, params.blur_sigma)
    } else {
        padded
    };
    threshold(&softened, params.threshold, ThresholdType::Binary)
}

/// The reconstructed score image ready for recognition.
#[derive(Debug, Clone)]
pub struct ScoreGlyphs {
    pub image: GrayImage,
    pub glyph_count: usize,
}

/// Runs the whole reconstruction over a labeled score region.
///
/// Returns `None` when no component survives the noise filter.
pub fn reconstruct_score(labels: &LabelMatrix, params: &GlyphParams) -> Option<ScoreGlyphs> {
    let components = analyze_labels(labels);
    let total = components.len();
    let glyphs = filter_glyphs(components, params.noise_height);

    debug!("Score glyphs: {} of {} components kept", glyphs.len(), total);

    let canvas = compose_glyphs(&glyphs, params.margin)?;
    Some(ScoreGlyphs {
        image: finish_canvas(&canvas, params),
        glyph_count: glyphs.len(),
    })
}
