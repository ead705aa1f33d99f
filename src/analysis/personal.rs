//! Personal best scores, kept in a JSON file sorted by play rating.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::score::{max_minus, ClearType, ScoreAnalysis};
use crate::catalog::CatalogEntry;
use crate::scorecard::format::{Difficulty, RecognizedResult};

/// One chart's best play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: String,
    #[serde(default)]
    pub sub_id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub combo: u32,
    pub clear: ClearType,
    pub max_minus: i64,
    pub play_rating: f64,
}

impl ScoreEntry {
    pub fn new(chart: &CatalogEntry, result: &RecognizedResult, analysis: &ScoreAnalysis) -> Self {
        Self {
            id: chart.song_id.clone(),
            sub_id: chart.sub_id.clone().unwrap_or_default(),
            name: chart.display.name.clone(),
            difficulty: chart.difficulty,
            score: result.score(),
            combo: result.combo(),
            clear: analysis.clear_type,
            max_minus: max_minus(result.score(), chart.note_count),
            play_rating: analysis.rating,
        }
    }

    fn same_chart(&self, other: &ScoreEntry) -> bool {
        self.id == other.id && self.sub_id == other.sub_id && self.difficulty == other.difficulty
    }
}

/// Outcome of [`ScoreBoard::add_score`]. Indices are positions in the
/// rating-sorted board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum UpdateResult {
    /// The stored score was equal or better; nothing changed.
    NoChange {
        old_idx: usize,
        old_score: u32,
        old_clear: ClearType,
    },
    /// First play recorded for this chart.
    NewScore { new_idx: usize },
    /// A better score replaced the stored one.
    ReplaceScore {
        old_idx: usize,
        new_idx: usize,
        old_score: u32,
        old_clear: ClearType,
    },
}

/// Best score per chart, highest rating first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    entries: Vec<ScoreEntry>,
}

impl ScoreBoard {
    /// Loads a board; a missing file is an empty board.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read score board: {}", path.display()))?;
        let mut board: ScoreBoard = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse score board: {}", path.display()))?;
        board.sort();
        Ok(board)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create score board directory")?;
        }
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize score board")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write score board: {}", path.display()))
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a play, keeping only the best score per chart.
    pub fn add_score(&mut self, entry: ScoreEntry) -> UpdateResult {
        let Some(old_idx) = self.entries.iter().position(|e| e.same_chart(&entry)) else {
            self.entries.push(entry);
            let new_idx = self.sort_and_locate(self.entries.len() - 1);
            return UpdateResult::NewScore { new_idx };
        };

        let old = &self.entries[old_idx];
        let (old_score, old_clear) = (old.score, old.clear);

        if old_score >= entry.score {
            return UpdateResult::NoChange {
                old_idx,
                old_score,
                old_clear,
            };
        }

        self.entries[old_idx] = entry;
        let new_idx = self.sort_and_locate(old_idx);
        UpdateResult::ReplaceScore {
            old_idx,
            new_idx,
            old_score,
            old_clear,
        }
    }

    /// Stable sort by rating; returns where the entry at `idx` ended up.
    fn sort_and_locate(&mut self, idx: usize) -> usize {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| {
            self.entries[b]
                .play_rating
                .total_cmp(&self.entries[a].play_rating)
        });
        let new_idx = order.iter().position(|&i| i == idx).unwrap_or(idx);

        let mut slots: Vec<Option<ScoreEntry>> = self.entries.drain(..).map(Some).collect();
        self.entries = order.into_iter().filter_map(|i| slots[i].take()).collect();
        new_idx
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.play_rating.total_cmp(&a.play_rating));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(id: &str, score: u32, rating: f64) -> ScoreEntry {
        ScoreEntry {
            id: id.to_string(),
            sub_id: String::new(),
            name: id.to_uppercase(),
            difficulty: Difficulty::Future,
            score,
            combo: 1000,
            clear: ClearType::Clear,
            max_minus: 10_001_000 - score as i64,
            play_rating: rating,
        }
    }

    #[test]
    fn test_new_scores_sorted_by_rating() {
        let mut board = ScoreBoard::default();
        assert_eq!(board.add_score(entry("a", 9_500_000, 9.0)), UpdateResult::NewScore { new_idx: 0 });
        assert_eq!(board.add_score(entry("b", 9_900_000, 11.0)), UpdateResult::NewScore { new_idx: 0 });
        assert_eq!(board.add_score(entry("c", 9_000_000, 10.0)), UpdateResult::NewScore { new_idx: 1 });

        let ids: Vec<&str> = board.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_replace_with_higher_score() {
        let mut board = ScoreBoard::default();
        board.add_score(entry("a", 9_500_000, 10.0));
        board.add_score(entry("b", 9_600_000, 9.0));

        let result = board.add_score(entry("b", 9_950_000, 12.0));
        assert_eq!(
            result,
            UpdateResult::ReplaceScore {
                old_idx: 1,
                new_idx: 0,
                old_score: 9_600_000,
                old_clear: ClearType::Clear,
            }
        );
        assert_eq!(board.len(), 2);
        assert_eq!(board.entries()[0].score, 9_950_000);
    }

    #[test]
    fn test_lower_score_is_no_change() {
        let mut board = ScoreBoard::default();
        board.add_score(entry("a", 9_800_000, 10.0));

        let result = board.add_score(entry("a", 9_700_000, 9.5));
        assert_eq!(
            result,
            UpdateResult::NoChange {
                old_idx: 0,
                old_score: 9_800_000,
                old_clear: ClearType::Clear,
            }
        );
        assert_eq!(board.entries()[0].score, 9_800_000);
    }

    #[test]
    fn test_other_difficulty_is_separate_chart() {
        let mut board = ScoreBoard::default();
        board.add_score(entry("a", 9_800_000, 10.0));

        let mut beyond = entry("a", 9_000_000, 8.0);
        beyond.difficulty = Difficulty::Beyond;
        assert_eq!(board.add_score(beyond), UpdateResult::NewScore { new_idx: 1 });
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boards").join("player.json");

        let mut board = ScoreBoard::default();
        board.add_score(entry("a", 9_800_000, 10.0));
        board.add_score(entry("b", 9_900_000, 11.0));
        board.save(&path).unwrap();

        let loaded = ScoreBoard::load(&path).unwrap();
        assert_eq!(loaded, board);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempdir().unwrap();
        let board = ScoreBoard::load(&dir.path().join("none.json")).unwrap();
        assert!(board.is_empty());
    }
}
