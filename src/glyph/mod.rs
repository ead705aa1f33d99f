//! Score glyph isolation and reconstruction.
//!
//! This module provides:
//! - Binarization of the score crop into ink and paper
//! - Two-pass connected-component labeling
//! - Reassembly of the surviving digits into a recognition-friendly canvas

pub mod binarize;
pub mod labeling;
pub mod reconstruct;

pub use binarize::{threshold_bright_pixels, BinaryMatrix};
pub use labeling::{label_components, LabelMatrix, BACKGROUND};
pub use reconstruct::{analyze_labels, reconstruct_score, ComponentLabel, GlyphParams, ScoreGlyphs};
