//! Rating, grade and clear classification for a single play.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score of a play with every note hit perfectly, before bonus points.
pub const MAX_BASE_SCORE: u32 = 10_000_000;

/// Letter grade, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    D,
    C,
    B,
    A,
    AA,
    EX,
    #[serde(rename = "EX+")]
    EXPlus,
}

impl Grade {
    /// Lower bound of each grade, highest first.
    const LADDER: [(u32, Grade); 6] = [
        (9_900_000, Grade::EXPlus),
        (9_800_000, Grade::EX),
        (9_500_000, Grade::AA),
        (9_200_000, Grade::A),
        (8_900_000, Grade::B),
        (8_600_000, Grade::C),
    ];

    /// Grade for `score`; a score on a boundary gets the higher grade.
    pub fn from_score(score: u32) -> Self {
        Self::LADDER
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map_or(Grade::D, |(_, grade)| *grade)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::D => "D",
            Grade::C => "C",
            Grade::B => "B",
            Grade::A => "A",
            Grade::AA => "AA",
            Grade::EX => "EX",
            Grade::EXPlus => "EX+",
        };
        f.write_str(s)
    }
}

/// How a chart was cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearType {
    Clear,
    FullRecall,
    PureMemory,
}

impl ClearType {
    /// Full combo at or above max score is a Pure Memory, below it a Full Recall.
    pub fn classify(score: u32, combo: u32, note_count: u32) -> Self {
        match (combo == note_count, score >= MAX_BASE_SCORE) {
            (true, true) => ClearType::PureMemory,
            (true, false) => ClearType::FullRecall,
            (false, _) => ClearType::Clear,
        }
    }
}

impl fmt::Display for ClearType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClearType::Clear => "Clear",
            ClearType::FullRecall => "Full Recall",
            ClearType::PureMemory => "Pure Memory",
        };
        f.write_str(s)
    }
}

/// Derived figures for one play.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreAnalysis {
    pub rating: f64,
    pub grade: Grade,
    /// Combo as a fraction of the chart's notes (0.0 to 1.0)
    pub percent_combo: f64,
    pub clear_type: ClearType,
    /// Notes not hit as shiny perfects; only set for Pure Memory
    pub near_miss_count: Option<i64>,
}

/// Rating offset contributed by the score alone.
///
/// 2.0 at max score, 1.0 at 9,800,000, 0.0 at 9,500,000, linear in between
/// and negative below.
pub fn score_modifier(score: u32) -> f64 {
    let score = score as f64;
    if score >= 10_000_000.0 {
        2.0
    } else if score >= 9_800_000.0 {
        1.0 + (score - 9_800_000.0) / 200_000.0
    } else {
        (score - 9_500_000.0) / 300_000.0
    }
}

/// Play rating: chart constant plus score modifier, floored at zero.
pub fn play_rating(score: u32, chart_constant: f64) -> f64 {
    (chart_constant + score_modifier(score)).max(0.0)
}

/// Shiny-perfect shortfall of a play: `10,000,000 + notes - score`.
pub fn max_minus(score: u32, note_count: u32) -> i64 {
    MAX_BASE_SCORE as i64 + note_count as i64 - score as i64
}

/// Analyzes one play of a chart.
pub fn analyze(score: u32, combo: u32, chart_constant: f64, note_count: u32) -> ScoreAnalysis {
    let clear_type = ClearType::classify(score, combo, note_count);
    let percent_combo = if note_count == 0 {
        0.0
    } else {
        combo as f64 / note_count as f64
    };

    ScoreAnalysis {
        rating: play_rating(score, chart_constant),
        grade: Grade::from_score(score),
        percent_combo,
        clear_type,
        near_miss_count: (clear_type == ClearType::PureMemory)
            .then(|| max_minus(score, note_count)),
    }
}
