use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Character set a recognition call is constrained to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharSet {
    /// Difficulty labels
    Alphabetic,
    /// Combo counts and the reconstructed score
    Digits,
}

impl CharSet {
    /// Value for Tesseract's `tessedit_char_whitelist`.
    pub fn whitelist(self) -> &'static str {
        match self {
            CharSet::Alphabetic => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
            CharSet::Digits => "0123456789",
        }
    }

    /// Page segmentation mode: labels are a line (they may carry a level
    /// after the name), numbers are a single word.
    pub fn page_segmentation(self) -> u8 {
        match self {
            CharSet::Alphabetic => 7,
            CharSet::Digits => 8,
        }
    }
}

/// A text recognition capability.
///
/// Implementations must be usable from worker threads; one instance serves
/// one call at a time.
pub trait Recognizer: Send {
    /// Reads the text in `image`, restricted to `charset`. Returns the
    /// trimmed text, which may be empty.
    fn recognize(&mut self, image: &GrayImage, charset: CharSet) -> Result<String>;
}

/// Runs the Tesseract command line tool on each call.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub fn new(paths: &TesseractPaths, language: &str) -> Self {
        Self {
            executable: paths.executable.clone(),
            tessdata: paths.tessdata.clone(),
            language: language.to_string(),
        }
    }

    fn command(&self, input: &std::path::Path, charset: CharSet) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg(input)
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(charset.page_segmentation().to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", charset.whitelist()))
            // Dictionaries only hurt on labels and numbers
            .arg("-c")
            .arg("load_system_dawg=0")
            .arg("-c")
            .arg("load_freq_dawg=0");
        command
    }
}

impl Recognizer for TesseractEngine {
    fn recognize(&mut self, image: &GrayImage, charset: CharSet) -> Result<String> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("Failed to write recognition input")?;

        let output = self
            .command(temp_input.path(), charset)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(clean_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Trims Tesseract output and drops the form feed it appends.
pub fn clean_output(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{c}')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_output() {
        assert_eq!(clean_output("FUTURE\n\u{c}"), "FUTURE");
        assert_eq!(clean_output("  09876543 \n"), "09876543");
        assert_eq!(clean_output("\u{c}"), "");
        assert_eq!(clean_output("Future 9+\n"), "Future 9+");
    }

    #[test]
    fn test_charset_whitelist() {
        assert!(CharSet::Digits.whitelist().chars().all(|c| c.is_ascii_digit()));
        assert!(CharSet::Alphabetic.whitelist().chars().all(|c| c.is_ascii_alphabetic()));
        assert_eq!(CharSet::Alphabetic.whitelist().len(), 52);
    }

    #[test]
    fn test_command_arguments() {
        let engine = TesseractEngine {
            executable: PathBuf::from("tesseract"),
            tessdata: PathBuf::from("/data/tessdata"),
            language: "eng".to_string(),
        };
        let command = engine.command(std::path::Path::new("in.png"), CharSet::Digits);
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(args[0], "in.png");
        assert_eq!(args[1], "stdout");
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "8"));
        assert!(args.contains(&"tessedit_char_whitelist=0123456789".to_string()));
    }
}
