//! Scorecard Reader
//!
//! Reads rhythm-game result screenshots: score, difficulty and combo via a
//! glyph-repairing OCR pipeline, the song via cover-art comparison against a
//! catalog, and the play rating from the recognized numbers.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod glyph;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod scorecard;

pub use analysis::{analyze, ScoreAnalysis};
pub use catalog::{identify_song, CatalogEntry, CatalogSource, JsonCatalog, SongMatch};
pub use config::{load_config, ReaderConfig};
pub use error::{ScorecardError, ScorecardResult};
pub use scorecard::{RecognizedResult, Scorecard, ScorecardReader, ScorecardReport};
