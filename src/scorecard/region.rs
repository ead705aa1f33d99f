//! Fixed-offset regions of the result screen.
//!
//! Offsets are tuned to a 1920×1080 frame. Any input is first reduced to its
//! largest centered 16:9 area and resized to that canonical size.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CANONICAL_WIDTH: u32 = 1920;
pub const CANONICAL_HEIGHT: u32 = 1080;

/// A rectangle in absolute pixel coordinates of the canonical frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

pub const COVER_REGION: PixelRect = PixelRect::new(46, 403, 562, 562);
pub const SCORE_REGION: PixelRect = PixelRect::new(727, 426, 475, 83);
pub const MODERN_LABEL_REGION: PixelRect = PixelRect::new(139, 303, 191, 38);
pub const MODERN_COMBO_REGION: PixelRect = PixelRect::new(326, 347, 106, 35);
pub const LEGACY_LABEL_REGION: PixelRect = PixelRect::new(37, 343, 251, 55);
pub const LEGACY_COMBO_REGION: PixelRect = PixelRect::new(255, 280, 151, 66);

/// Largest centered 16:9 rectangle inside a `width`×`height` image.
///
/// Wider inputs lose equal columns on both sides, taller inputs lose equal
/// rows at top and bottom.
pub fn sync_region(width: u32, height: u32) -> PixelRect {
    let (w, h) = (width as u64, height as u64);
    let (cw, ch) = (CANONICAL_WIDTH as u64, CANONICAL_HEIGHT as u64);

    if w * ch > h * cw {
        let synced_w = (h * cw / ch) as u32;
        PixelRect::new((width - synced_w) / 2, 0, synced_w, height)
    } else {
        let synced_h = (w * ch / cw) as u32;
        PixelRect::new(0, (height - synced_h) / 2, width, synced_h)
    }
}

/// Crops `rect` out of `img`, clamping it to the image bounds.
pub fn crop_region(img: &RgbaImage, rect: &PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = rect.x.min(w);
    let y0 = rect.y.min(h);
    let rw = rect.width.min(w - x0);
    let rh = rect.height.min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Removes letter/pillar boxing and resizes to the canonical frame.
pub fn normalize_frame(img: &RgbaImage) -> RgbaImage {
    let sync = sync_region(img.width(), img.height());
    debug!(
        "Sync region: {}x{} at ({}, {}) of {}x{}",
        sync.width,
        sync.height,
        sync.x,
        sync.y,
        img.width(),
        img.height()
    );

    let synced = crop_region(img, &sync);
    if synced.dimensions() == (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        return synced;
    }
    imageops::resize(&synced, CANONICAL_WIDTH, CANONICAL_HEIGHT, FilterType::Lanczos3)
}

/// Every crop the pipeline may need, cut from one normalized frame.
///
/// All six are produced before the layout is known.
#[derive(Clone, Debug)]
pub struct RegionSet {
    pub frame: RgbaImage,
    pub cover: RgbaImage,
    pub score: RgbaImage,
    pub modern_label: RgbaImage,
    pub modern_combo: RgbaImage,
    pub legacy_label: RgbaImage,
    pub legacy_combo: RgbaImage,
}

/// Normalizes `raw` and cuts the six fixed regions out of it.
pub fn extract_regions(raw: &RgbaImage) -> RegionSet {
    let frame = normalize_frame(raw);

    RegionSet {
        cover: crop_region(&frame, &COVER_REGION),
        score: crop_region(&frame, &SCORE_REGION),
        modern_label: crop_region(&frame, &MODERN_LABEL_REGION),
        modern_combo: crop_region(&frame, &MODERN_COMBO_REGION),
        legacy_label: crop_region(&frame, &LEGACY_LABEL_REGION),
        legacy_combo: crop_region(&frame, &LEGACY_COMBO_REGION),
        frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_sync_region_exact() {
        assert_eq!(sync_region(1920, 1080), PixelRect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn test_sync_region_wider_crops_sides() {
        // 21:9 phone screenshot
        let rect = sync_region(2520, 1080);
        assert_eq!(rect, PixelRect::new(300, 0, 1920, 1080));
    }

    #[test]
    fn test_sync_region_taller_crops_top_bottom() {
        // 4:3 tablet screenshot
        let rect = sync_region(1600, 1200);
        assert_eq!(rect, PixelRect::new(0, 150, 1600, 900));
    }

    #[test]
    fn test_crop_region() {
        let img: RgbaImage = ImageBuffer::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let cropped = crop_region(&img, &PixelRect::new(10, 50, 50, 20));

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img: RgbaImage = ImageBuffer::new(100, 100);
        let cropped = crop_region(&img, &PixelRect::new(90, 90, 50, 50));
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_extract_regions_sizes() {
        let img: RgbaImage = ImageBuffer::from_pixel(960, 540, Rgba([20, 20, 20, 255]));
        let regions = extract_regions(&img);

        assert_eq!(regions.frame.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));
        assert_eq!(regions.cover.dimensions(), (562, 562));
        assert_eq!(regions.score.dimensions(), (475, 83));
        assert_eq!(regions.modern_label.dimensions(), (191, 38));
        assert_eq!(regions.modern_combo.dimensions(), (106, 35));
        assert_eq!(regions.legacy_label.dimensions(), (251, 55));
        assert_eq!(regions.legacy_combo.dimensions(), (151, 66));
    }

    #[test]
    fn test_extract_regions_pillarboxed_content() {
        // Black bars left and right, content marked red at the score region
        let mut img: RgbaImage = ImageBuffer::from_pixel(2320, 1080, Rgba([0, 0, 0, 255]));
        for y in SCORE_REGION.y..SCORE_REGION.y + SCORE_REGION.height {
            for x in SCORE_REGION.x..SCORE_REGION.x + SCORE_REGION.width {
                img.put_pixel(x + 200, y, Rgba([255, 0, 0, 255]));
            }
        }

        let regions = extract_regions(&img);
        assert_eq!(regions.score.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
    }
}
