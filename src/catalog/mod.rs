//! Song catalog access and cover-art identification.
//!
//! The catalog itself belongs to an external store; this module defines the
//! read interface the pipeline needs, plus a JSON-file implementation that
//! re-reads the file on every lookup.

pub mod identify;
pub mod pixelmatch;

pub use identify::{identify_song, load_reference_cover, prepare_cover, SongMatch};
pub use pixelmatch::{pixel_difference, MatchOptions};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::scorecard::format::Difficulty;

/// Human-facing chart details.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub name: String,
    pub artist: String,
    pub charter: String,
}

/// One chart of one song.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub song_id: String,
    pub sub_id: Option<String>,
    pub difficulty: Difficulty,
    pub chart_constant: f64,
    pub note_count: u32,
    pub display: DisplayMetadata,
    /// Reference cover art, already at the canonical cover resolution
    pub cover_path: PathBuf,
}

/// Read access to the chart catalog.
///
/// Every call returns a fresh snapshot; callers never cache it.
pub trait CatalogSource {
    /// All entries, or only those of `difficulty` when given.
    fn entries(&self, difficulty: Option<Difficulty>) -> Result<Vec<CatalogEntry>>;
}

impl CatalogSource for [CatalogEntry] {
    fn entries(&self, difficulty: Option<Difficulty>) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .iter()
            .filter(|e| difficulty.is_none_or(|d| e.difficulty == d))
            .cloned()
            .collect())
    }
}

impl CatalogSource for Vec<CatalogEntry> {
    fn entries(&self, difficulty: Option<Difficulty>) -> Result<Vec<CatalogEntry>> {
        self.as_slice().entries(difficulty)
    }
}

/// Per-difficulty data as stored in the song list file.
#[derive(Clone, Debug, Deserialize)]
struct ChartRecord {
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    charter: String,
    cc: f64,
    notes: u32,
    #[serde(default)]
    subid: Option<String>,
}

/// One song as stored in the song list file.
#[derive(Clone, Debug, Deserialize)]
struct SongRecord {
    id: String,
    #[serde(default)]
    past: Option<ChartRecord>,
    #[serde(default)]
    present: Option<ChartRecord>,
    #[serde(default)]
    future: Option<ChartRecord>,
    #[serde(default)]
    beyond: Option<ChartRecord>,
    #[serde(default)]
    eternal: Option<ChartRecord>,
}

impl SongRecord {
    fn charts(&self) -> [(Difficulty, Option<&ChartRecord>); 5] {
        [
            (Difficulty::Past, self.past.as_ref()),
            (Difficulty::Present, self.present.as_ref()),
            (Difficulty::Future, self.future.as_ref()),
            (Difficulty::Beyond, self.beyond.as_ref()),
            (Difficulty::Eternal, self.eternal.as_ref()),
        ]
    }
}

/// A song list stored as JSON, with covers at `<covers_dir>/<id>.png`.
#[derive(Clone, Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    covers_dir: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>, covers_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            covers_dir: covers_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cover path for a song id.
    pub fn cover_path(&self, song_id: &str) -> PathBuf {
        self.covers_dir.join(format!("{}.png", song_id))
    }

    fn read_songs(&self) -> Result<Vec<SongRecord>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog: {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse catalog: {}", self.path.display()))
    }
}

impl CatalogSource for JsonCatalog {
    fn entries(&self, difficulty: Option<Difficulty>) -> Result<Vec<CatalogEntry>> {
        let mut entries = Vec::new();

        for song in self.read_songs()? {
            for (tier, chart) in song.charts() {
                let Some(chart) = chart else { continue };
                if difficulty.is_some_and(|d| d != tier) {
                    continue;
                }
                if chart.cc.is_nan() || chart.cc < 0.0 {
                    warn!("Skipping {} {}: invalid chart constant {}", song.id, tier, chart.cc);
                    continue;
                }

                entries.push(CatalogEntry {
                    song_id: song.id.clone(),
                    sub_id: chart.subid.clone(),
                    difficulty: tier,
                    chart_constant: chart.cc,
                    note_count: chart.notes,
                    display: DisplayMetadata {
                        name: chart.name.clone(),
                        artist: chart.artist.clone(),
                        charter: chart.charter.clone(),
                    },
                    cover_path: self.cover_path(&song.id),
                });
            }
        }

        Ok(entries)
    }
}
