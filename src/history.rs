//! Recently used target URLs, persisted as a JSON array.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::errors::LoadTestError;

/// Maximum number of URLs kept.
pub const MAX_HISTORY_SIZE: usize = 5;

/// Default history file name inside the user's data directory.
pub const HISTORY_FILE_NAME: &str = "url_history.json";

/// `$XDG_DATA_HOME/api_pulse/url_history.json`, falling back to
/// `~/.local/share` and finally the working directory.
pub fn default_history_path() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")));

    match base {
        Some(dir) => dir.join("api_pulse").join(HISTORY_FILE_NAME),
        None => PathBuf::from(HISTORY_FILE_NAME),
    }
}

/// Most-recent-first list of distinct target URLs.
#[derive(Debug, Clone)]
pub struct UrlHistory {
    path: PathBuf,
    urls: Vec<String>,
}

impl UrlHistory {
    /// Empty history backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            urls: Vec::new(),
        }
    }

    /// Loads the history file at `path`.
    ///
    /// A missing file yields an empty history. An unreadable or corrupted
    /// file is logged and ignored.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut history = Self::new(path);

        let contents = match tokio::fs::read_to_string(&history.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return history,
            Err(e) => {
                warn!(path = %history.path.display(), error = %e, "Failed to read URL history");
                return history;
            }
        };

        match serde_json::from_str::<Vec<String>>(&contents) {
            Ok(urls) => {
                history.urls = urls.into_iter().take(MAX_HISTORY_SIZE).collect();
                debug!(count = history.urls.len(), "Loaded URL history");
            }
            Err(e) => {
                warn!(path = %history.path.display(), error = %e, "Ignoring corrupted URL history");
            }
        }
        history
    }

    pub fn recent(&self) -> &[String] {
        &self.urls
    }

    /// Moves `url` to the front, dropping the oldest entry past the limit.
    ///
    /// Blank URLs are ignored.
    pub fn add(&mut self, url: &str) {
        if url.trim().is_empty() {
            return;
        }
        self.urls.retain(|existing| existing != url);
        self.urls.insert(0, url.to_string());
        self.urls.truncate(MAX_HISTORY_SIZE);
    }

    /// Writes the history, creating parent directories as needed.
    pub async fn save(&self) -> Result<(), LoadTestError> {
        let io_error = |source| LoadTestError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.urls)?;
        tokio::fs::write(&self.path, json).await.map_err(io_error)?;
        Ok(())
    }
}
