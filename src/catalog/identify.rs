//! Nearest-neighbor song identification by cover art.

use std::path::Path;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use tracing::{debug, info};

use super::pixelmatch::{pixel_difference, MatchOptions};
use super::{CatalogEntry, CatalogSource};
use crate::error::{ScorecardError, ScorecardResult};
use crate::scorecard::format::Difficulty;

/// The closest catalog entry and how far it was.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SongMatch {
    pub entry: CatalogEntry,
    /// Mismatching pixels at the canonical cover resolution
    pub diff: u64,
}

/// Resizes a cover crop to the canonical square and makes it opaque.
pub fn prepare_cover(cover: &RgbaImage, resolution: u32) -> RgbaImage {
    let mut resized = if cover.dimensions() == (resolution, resolution) {
        cover.clone()
    } else {
        imageops::resize(cover, resolution, resolution, FilterType::Lanczos3)
    };
    for pixel in resized.pixels_mut() {
        pixel[3] = u8::MAX;
    }
    resized
}

/// Loads a reference cover, resizing it if it is not at `resolution`.
pub fn load_reference_cover(path: &Path, resolution: u32) -> ScorecardResult<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| ScorecardError::catalog(format!("{}: {}", path.display(), e)))?
        .to_rgba8();

    if img.dimensions() != (resolution, resolution) {
        debug!(
            "Reference cover {} is {}x{}, resizing",
            path.display(),
            img.width(),
            img.height()
        );
    }
    Ok(prepare_cover(&img, resolution))
}

/// Finds the catalog entry of `difficulty` whose cover is closest to `cover`.
///
/// `cover` must already be prepared with [`prepare_cover`]. Every candidate
/// is scored, with no cutoff; the smallest difference wins even when it is
/// large. Candidates are visited in (song id, sub id) order and the first
/// minimum is kept, so ties go to the lowest id. An empty tier gives
/// `Ok(None)`.
pub fn identify_song<C>(
    difficulty: Difficulty,
    cover: &RgbaImage,
    catalog: &C,
    options: &MatchOptions,
) -> ScorecardResult<Option<SongMatch>>
where
    C: CatalogSource + ?Sized,
{
    let started = Instant::now();
    let resolution = cover.width();

    let mut candidates: Vec<CatalogEntry> = catalog
        .entries(Some(difficulty))
        .map_err(|e| ScorecardError::catalog(format!("{:#}", e)))?
        .into_iter()
        .filter(|e| e.difficulty == difficulty)
        .collect();
    candidates.sort_by(|a, b| (&a.song_id, &a.sub_id).cmp(&(&b.song_id, &b.sub_id)));

    let total = candidates.len();
    let mut best: Option<SongMatch> = None;

    for entry in candidates {
        let reference = load_reference_cover(&entry.cover_path, resolution)?;
        let diff = pixel_difference(cover, &reference, options).ok_or_else(|| {
            ScorecardError::catalog(format!("cover size mismatch for {}", entry.song_id))
        })?;

        if best.as_ref().is_none_or(|b| diff < b.diff) {
            best = Some(SongMatch { entry, diff });
        }
    }

    match &best {
        Some(m) => info!(
            "Matched {} covers in {:.2}s: {} (diff {})",
            total,
            started.elapsed().as_secs_f32(),
            m.entry.song_id,
            m.diff
        ),
        None => info!("No {} charts in catalog", difficulty),
    }

    Ok(best)
}
