//! Intermediate images written when a debug directory is configured.

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::region::RegionSet;
use crate::glyph::{LabelMatrix, BACKGROUND};

/// Paints every component in its own color on a black background.
///
/// Colors step around the hue circle by the golden angle, so neighboring
/// ids stay distinguishable and a given id always gets the same color.
pub fn colorize_labels(labels: &LabelMatrix) -> RgbImage {
    RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
        match labels.get(x, y) {
            BACKGROUND => Rgb([0, 0, 0]),
            id => label_color(id),
        }
    })
}

fn label_color(id: u32) -> Rgb<u8> {
    let hue = (id as f32 * 137.508) % 360.0;
    let sector = hue / 60.0;
    let fraction = sector.fract();
    let rising = (fraction * 255.0) as u8;
    let falling = 255 - rising;
    match sector as u32 {
        0 => Rgb([255, rising, 0]),
        1 => Rgb([falling, 255, 0]),
        2 => Rgb([0, 255, rising]),
        3 => Rgb([0, falling, 255]),
        4 => Rgb([rising, 0, 255]),
        _ => Rgb([255, 0, falling]),
    }
}

/// Everything one run can dump.
pub struct DebugImages<'a> {
    pub regions: &'a RegionSet,
    pub labels: &'a LabelMatrix,
    pub score: Option<&'a GrayImage>,
}

/// Writes the run's images into `<dir>/<stem>/`, returning the folder.
pub fn save_debug_images(dir: &Path, stem: &str, images: &DebugImages<'_>) -> Result<PathBuf> {
    let out = dir.join(stem);
    fs::create_dir_all(&out)
        .with_context(|| format!("Failed to create debug directory: {}", out.display()))?;

    let regions = images.regions;
    let crops: [(&str, &RgbaImage); 7] = [
        ("scorecard", &regions.frame),
        ("cover", &regions.cover),
        ("score_raw", &regions.score),
        ("label_modern", &regions.modern_label),
        ("combo_modern", &regions.modern_combo),
        ("label_legacy", &regions.legacy_label),
        ("combo_legacy", &regions.legacy_combo),
    ];
    for (name, img) in crops {
        save_png(img.clone(), &out.join(format!("{}.png", name)))?;
    }

    save_png(colorize_labels(images.labels), &out.join("score_labels.png"))?;
    if let Some(score) = images.score {
        save_png(score.clone(), &out.join("score_processed.png"))?;
    }

    debug!("Debug images saved to {}", out.display());
    Ok(out)
}

fn save_png(img: impl Into<DynamicImage>, path: &Path) -> Result<()> {
    img.into()
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{label_components, BinaryMatrix};
    use crate::scorecard::region::extract_regions;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    #[test]
    fn test_colorize_labels() {
        let labels = label_components(&BinaryMatrix::from_rows(&["#..#", "#..#"]));
        let colored = colorize_labels(&labels);

        assert_eq!(colored.get_pixel(1, 0), &Rgb([0, 0, 0]));
        let left = colored.get_pixel(0, 0);
        let right = colored.get_pixel(3, 0);
        assert_ne!(left, &Rgb([0, 0, 0]));
        assert_ne!(left, right);
        assert_eq!(left, colored.get_pixel(0, 1));
    }

    #[test]
    fn test_save_debug_images() {
        let raw: RgbaImage = ImageBuffer::from_pixel(192, 108, Rgba([40, 40, 40, 255]));
        let regions = extract_regions(&raw);
        let labels = label_components(&BinaryMatrix::from_rows(&["#."]));
        let score = GrayImage::new(4, 4);

        let dir = tempdir().unwrap();
        let out = save_debug_images(
            dir.path(),
            "shot",
            &DebugImages {
                regions: &regions,
                labels: &labels,
                score: Some(&score),
            },
        )
        .unwrap();

        for name in ["scorecard", "cover", "score_raw", "score_labels", "score_processed"] {
            assert!(out.join(format!("{}.png", name)).exists(), "{} missing", name);
        }
    }
}
