//! What happens to a recognized scorecard after the pipeline.
//!
//! - Rating, grade and clear classification of a play
//! - Personal best board kept as JSON
//! - Append-only CSV log of processed scorecards
//! - JSON export of a processed batch

pub mod csv_writer;
pub mod export;
pub mod personal;
pub mod score;

pub use export::{export_to_json, BatchReport, ReportItem};
pub use personal::{ScoreBoard, ScoreEntry, UpdateResult};
pub use score::{analyze, play_rating, score_modifier, ClearType, Grade, ScoreAnalysis};
