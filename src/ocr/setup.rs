use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(not(windows))]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];
#[cfg(windows)]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing downloaded Tesseract data
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scorecard-reader")
        .join("tesseract")
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Finds the Tesseract executable: configured path first, then PATH, then
/// common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured tesseract not found at {}", path.display());
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new(EXECUTABLE_NAME)
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from(EXECUTABLE_NAME));
        }
    }

    COMMON_INSTALL_DIRS
        .iter()
        .map(|dir| PathBuf::from(dir).join(EXECUTABLE_NAME))
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let file = traineddata_name(language);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(&prefix));
        candidates.push(PathBuf::from(&prefix).join("tessdata"));
    }
    candidates.extend(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));

    candidates.into_iter().find(|dir| dir.join(&file).exists())
}

/// Ensures Tesseract and the trained data for `language` are available.
/// Downloads the trained data into the local data directory if necessary.
pub fn ensure_tesseract(
    executable: Option<&Path>,
    tessdata: Option<&Path>,
    language: &str,
) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(executable)?;

    let tessdata = match find_tessdata_dir(tessdata, language) {
        Some(dir) => dir,
        None => {
            let dir = get_tesseract_dir().join("tessdata");
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            download_tessdata(&dir, language)?;
            dir
        }
    };

    info!(
        "Tesseract ready: {} (tessdata {})",
        executable.display(),
        tessdata.display()
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads `<language>.traineddata` from the tessdata repository
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file);
    let path = tessdata_dir.join(&file);

    info!("Downloading {}...", file);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "scorecard-reader")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut out = fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    out.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}
