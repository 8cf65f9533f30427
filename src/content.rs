//! Content store: one directory per period.
//!
//! Maps a period number to the text and images that make up that period's
//! post.
//!
//! ## Directory Structure
//!
//! ```text
//! images/                    # Content root
//! ├── week1/
//! │   ├── content.txt        # Post body (mandatory)
//! │   ├── 01-board.jpg       # Attached in filename order
//! │   └── 02-wiring.PNG      # Extensions match case-insensitively
//! ├── week2/
//! │   └── content.txt        # Text-only post
//! └── week3/
//!     ├── content.txt
//!     ├── notes.md           # Ignored: not an image
//!     └── .DS_Store          # Ignored: hidden
//! ```
//!
//! ## Rules
//!
//! - The period directory and its text file must exist.
//! - The text is trimmed and must not be empty.
//! - Images are the regular files ending in `.jpg`, `.jpeg` or `.png`, sorted
//!   by file name. Hidden files and sub-directories are skipped.
//! - Zero images is valid and produces a text-only post.

use crate::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("No content directory for week {period}: {path}")]
    PeriodDirMissing { period: u32, path: PathBuf },
    #[error("Missing text file for week {period}: {path}")]
    TextMissing { period: u32, path: PathBuf },
    #[error("Text file for week {period} is empty: {path}")]
    EmptyText { period: u32, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// True for the "nothing to publish for this period" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::PeriodDirMissing { .. } | ContentError::TextMissing { .. }
        )
    }
}

/// Everything needed to publish one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBundle {
    pub period: u32,
    /// Directory the bundle was read from.
    pub dir: PathBuf,
    /// Post body, trimmed, never empty.
    pub text: String,
    /// Image files in publication order.
    pub images: Vec<PathBuf>,
}

/// Source of per-period content.
pub trait ContentSource {
    fn resolve(&self, period: u32) -> Result<ContentBundle, ContentError>;
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Content laid out as `<root>/<prefix><period>/`.
#[derive(Debug, Clone)]
pub struct ContentDir {
    root: PathBuf,
    dir_prefix: String,
    text_file: String,
}

impl ContentDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dir_prefix: "week".to_string(),
            text_file: "content.txt".to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            root: config.content_root(),
            dir_prefix: config.content.dir_prefix.clone(),
            text_file: config.content.text_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `period`'s content (whether or not it exists).
    pub fn period_dir(&self, period: u32) -> PathBuf {
        self.root.join(format!("{}{}", self.dir_prefix, period))
    }

    /// Period number encoded in a directory name, e.g. `week12` → 12.
    ///
    /// Only the exact form [`period_dir`](Self::period_dir) builds is accepted,
    /// so `week01` and `week0` are not periods.
    pub fn parse_period_dir(&self, name: &str) -> Option<u32> {
        let digits = name.strip_prefix(&self.dir_prefix)?;
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        digits.parse().ok()
    }

    /// Every period that has a directory under the root, ascending.
    pub fn available_periods(&self) -> Result<Vec<u32>, ContentError> {
        let mut periods: Vec<u32> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| self.parse_period_dir(&e.file_name().to_string_lossy()))
            .collect();
        periods.sort_unstable();
        Ok(periods)
    }
}

impl ContentSource for ContentDir {
    fn resolve(&self, period: u32) -> Result<ContentBundle, ContentError> {
        let dir = self.period_dir(period);
        if !dir.is_dir() {
            return Err(ContentError::PeriodDirMissing { period, path: dir });
        }

        let text_path = dir.join(&self.text_file);
        if !text_path.is_file() {
            return Err(ContentError::TextMissing {
                period,
                path: text_path,
            });
        }
        let text = fs::read_to_string(&text_path)?.trim().to_string();
        if text.is_empty() {
            return Err(ContentError::EmptyText {
                period,
                path: text_path,
            });
        }

        let images = collect_images(&dir)?;

        Ok(ContentBundle {
            period,
            dir,
            text,
            images,
        })
    }
}

fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let hidden = p
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            !hidden && is_image(p)
        })
        .collect();

    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
