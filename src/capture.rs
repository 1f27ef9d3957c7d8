//! Raw page capture for debugging extraction
//!
//! Writes are spawned and never awaited by the crawl; a failed write only logs.

use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MAX_FILE_STEM: usize = 150;

/// Writes fetched page bodies under a directory
#[derive(Clone, Debug)]
pub struct PageCapture {
    dir: PathBuf,
}

impl PageCapture {
    /// Capture into `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Spawn a write of `body` to `<dir>/<sanitized url>.html`
    pub fn capture(&self, url: &str, body: String) -> JoinHandle<()> {
        let path = self.dir.join(capture_file_name(url));
        let dir = self.dir.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %e, "Failed to create capture directory");
                return;
            }
            match tokio::fs::write(&path, body).await {
                Ok(()) => debug!(path = %path.display(), "Captured page"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to capture page"),
            }
        })
    }
}

/// File name for a captured page: URL with every non-alphanumeric run replaced by `_`
pub fn capture_file_name(url: &str) -> String {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);

    let mut stem = String::with_capacity(without_scheme.len());
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem: String = stem.trim_matches('_').chars().take(MAX_FILE_STEM).collect();

    if stem.is_empty() {
        "page.html".to_string()
    } else {
        format!("{stem}.html")
    }
}
