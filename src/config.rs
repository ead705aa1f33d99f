//! Reader configuration.
//!
//! Loaded from config.json at startup and handed to the reader explicitly.
//! Every field has a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::catalog::MatchOptions;
use crate::glyph::GlyphParams;

/// Complete reader configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Score pixels with R, G and B all above this count as ink
    #[serde(default = "default_binarize_threshold")]
    pub binarize_threshold: u8,
    /// Components shorter than this (pixels) are dropped as noise
    #[serde(default = "default_noise_height")]
    pub noise_height: u32,
    /// Gap around and between glyphs on the rebuilt canvas
    #[serde(default = "default_glyph_margin")]
    pub glyph_margin: u32,
    /// Horizontal shear undoing the italic score font
    #[serde(default = "default_shear")]
    pub shear: f32,
    #[serde(default = "default_border")]
    pub border: u32,
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    #[serde(default = "default_rethreshold")]
    pub rethreshold: u8,
    /// Side of the square cover art is compared at
    #[serde(default = "default_cover_resolution")]
    pub cover_resolution: u32,
    /// Color tolerance of the cover comparison (0.0-1.0)
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: f64,
    #[serde(default)]
    pub include_anti_aliased: bool,
    /// Number of recognition workers
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Upper bound on a single recognition call (milliseconds)
    #[serde(default = "default_recognition_timeout_ms")]
    pub recognition_timeout_ms: u64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tesseract_executable: Option<PathBuf>,
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
    /// When set, intermediate images are written here
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

fn default_binarize_threshold() -> u8 {
    128
}

fn default_noise_height() -> u32 {
    15
}

fn default_glyph_margin() -> u32 {
    5
}

fn default_shear() -> f32 {
    0.11
}

fn default_border() -> u32 {
    4
}

fn default_blur_sigma() -> f32 {
    0.8
}

fn default_rethreshold() -> u8 {
    128
}

fn default_cover_resolution() -> u32 {
    128
}

fn default_pixel_threshold() -> f64 {
    0.1
}

fn default_pool_size() -> usize {
    4
}

fn default_recognition_timeout_ms() -> u64 {
    20_000
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: default_binarize_threshold(),
            noise_height: default_noise_height(),
            glyph_margin: default_glyph_margin(),
            shear: default_shear(),
            border: default_border(),
            blur_sigma: default_blur_sigma(),
            rethreshold: default_rethreshold(),
            cover_resolution: default_cover_resolution(),
            pixel_threshold: default_pixel_threshold(),
            include_anti_aliased: false,
            pool_size: default_pool_size(),
            recognition_timeout_ms: default_recognition_timeout_ms(),
            language: default_language(),
            tesseract_executable: None,
            tessdata_dir: None,
            debug_dir: None,
        }
    }
}

impl ReaderConfig {
    pub fn glyph_params(&self) -> GlyphParams {
        GlyphParams {
            noise_height: self.noise_height,
            margin: self.glyph_margin,
            shear: self.shear,
            border: self.border,
            blur_sigma: self.blur_sigma,
            threshold: self.rethreshold,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.pixel_threshold,
            include_anti_aliased: self.include_anti_aliased,
        }
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_millis(self.recognition_timeout_ms)
    }
}

/// Loads configuration from `path`, or config.json next to the executable.
///
/// A missing or unreadable file falls back to defaults with a warning.
pub fn load_config(path: Option<&Path>) -> ReaderConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::paths::default_config_path);

    info!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        info!("{} not found. Using default config.", config_path.display());
        return ReaderConfig::default();
    }

    match fs::read_to_string(&config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                ReaderConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
            ReaderConfig::default()
        }
    }
}
