//! Layout disambiguation for recognized scorecard text.
//!
//! Two result-screen layouts exist. The modern one prints the difficulty in
//! upper case (`FUTURE`) and has an extra top tier; the legacy one prints it in
//! title case and usually followed by the level (`Future 9+`). Both share the
//! same score field: exactly eight digits, zero padded.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ScorecardError, ScorecardResult};

/// Score field: eight digits, zero padded (`09876543`).
pub const SCORE_PATTERN: &str = r"^\d{8}$";

static SCORE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SCORE_PATTERN).expect("score pattern is a valid regex"));

/// Difficulty labels as printed by the modern layout, in tier order.
pub const MODERN_LABELS: [&str; 5] = ["PAST", "PRESENT", "FUTURE", "BEYOND", "ETERNAL"];

/// Difficulty label prefixes printed by the legacy layout, in tier order.
pub const LEGACY_PREFIXES: [&str; 4] = ["Past", "Present", "Future", "Beyond"];

/// Which result-screen layout a scorecard was read with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    Legacy,
    Modern,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::Legacy => write!(f, "legacy"),
            FormatVersion::Modern => write!(f, "modern"),
        }
    }
}

/// Chart difficulty tier, ordered from easiest to hardest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Past,
    Present,
    Future,
    Beyond,
    Eternal,
}

impl Difficulty {
    /// Every tier, indexed by [`Difficulty::index`].
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Past,
        Difficulty::Present,
        Difficulty::Future,
        Difficulty::Beyond,
        Difficulty::Eternal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display name ("Past", "Present", ...).
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Past => "Past",
            Difficulty::Present => "Present",
            Difficulty::Future => "Future",
            Difficulty::Beyond => "Beyond",
            Difficulty::Eternal => "Eternal",
        }
    }

    /// Matches a modern label exactly (case-sensitive, no surrounding whitespace).
    pub fn from_modern_label(text: &str) -> Option<Self> {
        MODERN_LABELS
            .iter()
            .position(|label| *label == text)
            .and_then(Self::from_index)
    }

    /// Matches the start of a legacy label (case-sensitive).
    pub fn from_legacy_label(text: &str) -> Option<Self> {
        LEGACY_PREFIXES
            .iter()
            .position(|prefix| text.starts_with(prefix))
            .and_then(Self::from_index)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty: {}", s))
    }
}

/// The raw strings returned by the recognition engine for one scorecard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReadings {
    pub score: String,
    pub modern_label: String,
    pub modern_combo: String,
    pub legacy_label: String,
    pub legacy_combo: String,
}

impl fmt::Display for RawReadings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received score \"{}\", difficulties \"{}\", \"{}\", combos \"{}\", \"{}\"",
            self.score, self.modern_label, self.legacy_label, self.modern_combo, self.legacy_combo
        )
    }
}

/// A validated scorecard reading.
///
/// Only [`disambiguate`] builds one, so a value always carries a score that
/// matched [`SCORE_PATTERN`] and a combo that parsed as an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecognizedResult {
    format: FormatVersion,
    score: u32,
    difficulty: Difficulty,
    combo: u32,
}

impl RecognizedResult {
    pub fn format(&self) -> FormatVersion {
        self.format
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }
}

/// Parses a combo reading: one or more ASCII digits, nothing else.
fn parse_combo(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl FormatVersion {
    /// Evaluation order: modern first, legacy only when modern fails.
    const CANDIDATES: [FormatVersion; 2] = [FormatVersion::Modern, FormatVersion::Legacy];

    /// Tries to read `readings` with this layout's label and combo fields.
    fn evaluate(self, readings: &RawReadings, score: Option<u32>) -> Option<RecognizedResult> {
        let (difficulty, combo) = match self {
            FormatVersion::Modern => (
                Difficulty::from_modern_label(&readings.modern_label)?,
                parse_combo(&readings.modern_combo)?,
            ),
            FormatVersion::Legacy => (
                Difficulty::from_legacy_label(&readings.legacy_label)?,
                parse_combo(&readings.legacy_combo)?,
            ),
        };

        Some(RecognizedResult {
            format: self,
            score: score?,
            difficulty,
            combo,
        })
    }
}

/// Chooses the layout that explains the readings and builds the result.
///
/// Fails with [`ScorecardError::UnrecognizedFormat`] carrying every raw
/// string when neither layout validates.
pub fn disambiguate(readings: &RawReadings) -> ScorecardResult<RecognizedResult> {
    let score = if SCORE_REGEX.is_match(&readings.score) {
        readings.score.parse::<u32>().ok()
    } else {
        None
    };

    for candidate in FormatVersion::CANDIDATES {
        if let Some(result) = candidate.evaluate(readings, score) {
            info!(
                "{} scorecard detected: {} {} combo {}",
                result.format, result.difficulty, result.score, result.combo
            );
            return Ok(result);
        }
        debug!("{} layout rejected", candidate);
    }

    Err(ScorecardError::UnrecognizedFormat(readings.clone()))
}
