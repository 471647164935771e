use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const DB_ENV: &str = "STUDYTRACK_DB";
pub const LOG_ENV: &str = "STUDYTRACK_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

const DATA_DIR: &str = ".studytrack";
const DB_FILE: &str = "studytrack.db";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn resolve(db_flag: Option<PathBuf>) -> Result<Self, AppError> {
        Self::resolve_with(db_flag, |key| std::env::var(key).ok())
    }

    /// `--db` wins, then `STUDYTRACK_DB`, then `$HOME/.studytrack/studytrack.db`.
    pub fn resolve_with<F>(db_flag: Option<PathBuf>, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = db_flag.filter(|path| !path.as_os_str().is_empty()) {
            return Ok(Self {
                db_path: absolutize(path)?,
            });
        }

        if let Some(value) = env(DB_ENV).filter(|value| !value.trim().is_empty()) {
            return Ok(Self {
                db_path: absolutize(PathBuf::from(value.trim()))?,
            });
        }

        if let Some(home) = env("HOME").filter(|value| !value.trim().is_empty()) {
            return Ok(Self {
                db_path: default_db_path(Path::new(&home)),
            });
        }

        Err(AppError::InvalidInput(format!(
            "unable to resolve database path; pass --db or set {DB_ENV}"
        )))
    }
}

pub fn default_db_path(home: &Path) -> PathBuf {
    home.join(DATA_DIR).join(DB_FILE)
}

/// Log filter directive: `STUDYTRACK_LOG`, then `RUST_LOG`, then `warn`.
pub fn log_filter() -> String {
    log_filter_with(|key| std::env::var(key).ok())
}

pub fn log_filter_with<F>(env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env(LOG_ENV)
        .or_else(|| env("RUST_LOG"))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

// sqlite URLs need an absolute file path.
fn absolutize(path: PathBuf) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}
