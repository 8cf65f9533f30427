//! Shared test utilities for the weekly-post test suite.
//!
//! Provides fixture setup, content-directory builders and small extractors
//! that work with [`ContentBundle`] and the pipeline's recorded calls.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let bundle = ContentDir::new(tmp.path()).resolve(1).unwrap();
//! assert_eq!(image_names(&bundle), vec!["01-board.jpg", "02-wiring.PNG", "03-case.jpeg"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::content::ContentBundle;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// The fixture tree holds `week1/` (text + three images) and `week2/`
/// (text only). Tests get an isolated copy they can mutate freely.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Create `<root>/week<period>/` with a text file and placeholder images.
///
/// Each image's bytes are its own file name, so uploads can be matched back
/// to their source in assertions.
pub fn write_period(root: &Path, period: u32, text: &str, images: &[&str]) -> PathBuf {
    let dir = root.join(format!("week{period}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("content.txt"), text).unwrap();
    for name in images {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
    dir
}

// =========================================================================
// Extractors
// =========================================================================

/// File names of a bundle's images in publication order.
pub fn image_names(bundle: &ContentBundle) -> Vec<String> {
    bundle
        .images
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}
