use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the log file path: `<exe_dir>/logs/scorecard_reader.log`
pub fn get_log_file() -> PathBuf {
    get_logs_dir().join("scorecard_reader.log")
}

/// Returns the default config path: `<exe_dir>/config.json`
pub fn default_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_exe_dir() {
        let exe_dir = get_exe_dir();
        assert!(get_log_file().starts_with(exe_dir));
        assert_eq!(default_config_path().file_name().unwrap(), "config.json");
        assert_eq!(get_log_file().parent().unwrap(), get_logs_dir());
    }
}
