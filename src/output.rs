//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Week 3 (scheduled)
//!     check ledger
//!     resolve content
//!         Source: images/week3
//!         Text: 42 chars, 2 images
//!     upload assets
//!         001 01-board.jpg → urn:li:digitalmediaAsset:C55
//!         002 02-wiring.png → urn:li:digitalmediaAsset:D71
//!     publish
//!         Post: urn:li:share:7150000000000000000
//!     record ledger
//!         Recorded: 2024-01-15T01:00:00.123Z
//!     done
//! ```
//!
//! A skipped week prints `Already published` with the recorded entry; an
//! aborted run prints the failing stage and the error.
//!
//! ## Check
//!
//! ```text
//! Week 1 (images/week1)
//!     Text: Week one: the Pi is alive.
//!     001 01-board.jpg (image/jpeg)
//!     002 02-wiring.PNG (image/png)
//! Week 3
//!     No content: No content directory for week 3: images/week3
//! ```
//!
//! ## Ledger
//!
//! ```text
//! Ledger: posted.json
//! Week  Published                 Post
//!    1  2024-01-01T01:00:00.123Z  urn:li:share:1
//!    2  2024-01-08T01:00:02.000Z  -
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::content::{ContentBundle, ContentError};
use crate::ledger::LedgerEntry;
use crate::pipeline::{PipelineEvent, Stage};
use crate::upload::content_type_for;
use chrono::SecondsFormat;
use std::path::Path;

const TEXT_PREVIEW_CHARS: usize = 60;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// First line of `text`, cut to `max` characters with `...` appended when cut.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == text.len() {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn timestamp(entry: &LedgerEntry) -> String {
    entry
        .published_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Run
// ============================================================================

/// Format a single pipeline event as display lines.
pub fn format_run_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Started { period, trigger } => {
            vec![format!("Week {} ({})", period, trigger)]
        }
        PipelineEvent::StageEntered { stage, .. } => match stage {
            Stage::Idle | Stage::Aborted => Vec::new(),
            _ => vec![format!("{}{}", indent(1), stage)],
        },
        PipelineEvent::AlreadyPublished { entry } => vec![
            format!("{}Already published", indent(1)),
            format!("{}Recorded: {}", indent(2), timestamp(entry)),
            format!(
                "{}Post: {}",
                indent(2),
                entry.remote_post_id.as_deref().unwrap_or("-")
            ),
        ],
        PipelineEvent::ContentResolved {
            dir,
            text_chars,
            images,
            ..
        } => vec![
            format!("{}Source: {}", indent(2), dir.display()),
            format!(
                "{}Text: {} chars, {} image{}",
                indent(2),
                text_chars,
                images,
                if *images == 1 { "" } else { "s" }
            ),
        ],
        PipelineEvent::ImageUploaded {
            index, path, asset, ..
        } => vec![format!(
            "{}{} {} \u{2192} {}",
            indent(2),
            format_index(*index),
            file_name(path),
            asset
        )],
        PipelineEvent::Published { post_id, .. } => vec![format!(
            "{}Post: {}",
            indent(2),
            post_id.as_deref().unwrap_or("(no id returned)")
        )],
        PipelineEvent::Recorded { entry } => {
            vec![format!("{}Recorded: {}", indent(2), timestamp(entry))]
        }
        PipelineEvent::Aborted { stage, reason, .. } => {
            vec![format!("{}Aborted during {}: {}", indent(1), stage, reason)]
        }
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format a resolved bundle for the `check` command.
pub fn format_bundle(bundle: &ContentBundle) -> Vec<String> {
    let mut lines = vec![
        format!("Week {} ({})", bundle.period, bundle.dir.display()),
        format!("{}Text: {}", indent(1), preview(&bundle.text, TEXT_PREVIEW_CHARS)),
    ];
    if bundle.images.is_empty() {
        lines.push(format!("{}No images (text-only post)", indent(1)));
    }
    for (i, image) in bundle.images.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({})",
            indent(1),
            format_index(i + 1),
            file_name(image),
            content_type_for(image)
        ));
    }
    lines
}

pub fn print_bundle(bundle: &ContentBundle) {
    for line in format_bundle(bundle) {
        println!("{}", line);
    }
}

/// Format a period that failed to resolve. Missing content reads differently
/// from a broken folder.
pub fn format_check_error(period: u32, err: &ContentError) -> Vec<String> {
    let label = if err.is_not_found() { "No content" } else { "Error" };
    vec![
        format!("Week {}", period),
        format!("{}{}: {}", indent(1), label, err),
    ]
}

pub fn print_check_error(period: u32, err: &ContentError) {
    for line in format_check_error(period, err) {
        println!("{}", line);
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Format the ledger at `path` as a table, oldest first.
pub fn format_ledger(path: &Path, entries: &[LedgerEntry]) -> Vec<String> {
    let mut lines = vec![format!("Ledger: {}", path.display())];
    if entries.is_empty() {
        lines.push("No weeks published yet".to_string());
        return lines;
    }
    lines.push(format!("{:<4}  {:<24}  {}", "Week", "Published", "Post"));
    for entry in entries {
        lines.push(format!(
            "{:>4}  {:<24}  {}",
            entry.period,
            timestamp(entry),
            entry.remote_post_id.as_deref().unwrap_or("-")
        ));
    }
    lines
}

pub fn print_ledger(path: &Path, entries: &[LedgerEntry]) {
    for line in format_ledger(path, entries) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AssetHandle;
    use crate::ledger::JsonFileStore;
    use crate::pipeline::Trigger;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn entry(period: u32, post_id: Option<&str>) -> LedgerEntry {
        LedgerEntry::new(
            period,
            Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap(),
            post_id.map(String::from),
        )
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn preview_short_single_line() {
        assert_eq!(preview("Hello World", 60), "Hello World");
    }

    #[test]
    fn preview_cuts_long_line() {
        assert_eq!(preview("abcdefgh", 3), "abc...");
    }

    #[test]
    fn preview_marks_dropped_lines() {
        assert_eq!(preview("first\nsecond", 60), "first...");
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    // =========================================================================
    // Run events
    // =========================================================================

    #[test]
    fn started_line() {
        let lines = format_run_event(&PipelineEvent::Started {
            period: 3,
            trigger: Trigger::Scheduled,
        });
        assert_eq!(lines, vec!["Week 3 (scheduled)"]);
    }

    #[test]
    fn stage_lines_skip_idle_and_aborted() {
        let stage = |stage| format_run_event(&PipelineEvent::StageEntered { period: 1, stage });
        assert_eq!(stage(Stage::UploadAssets), vec!["    upload assets"]);
        assert!(stage(Stage::Idle).is_empty());
        assert!(stage(Stage::Aborted).is_empty());
    }

    #[test]
    fn content_resolved_lines() {
        let lines = format_run_event(&PipelineEvent::ContentResolved {
            period: 3,
            dir: PathBuf::from("images/week3"),
            text_chars: 11,
            images: 1,
        });
        assert_eq!(lines[0], "        Source: images/week3");
        assert_eq!(lines[1], "        Text: 11 chars, 1 image");
    }

    #[test]
    fn image_uploaded_line() {
        let lines = format_run_event(&PipelineEvent::ImageUploaded {
            index: 2,
            total: 3,
            path: PathBuf::from("images/week3/b.png"),
            asset: AssetHandle::new("urn:li:digitalmediaAsset:B"),
        });
        assert_eq!(
            lines,
            vec!["        002 b.png \u{2192} urn:li:digitalmediaAsset:B"]
        );
    }

    #[test]
    fn published_without_id() {
        let lines = format_run_event(&PipelineEvent::Published {
            period: 4,
            post_id: None,
        });
        assert_eq!(lines, vec!["        Post: (no id returned)"]);
    }

    #[test]
    fn already_published_shows_entry() {
        let lines = format_run_event(&PipelineEvent::AlreadyPublished {
            entry: entry(5, Some("urn:li:share:5")),
        });
        assert_eq!(
            lines,
            vec![
                "    Already published",
                "        Recorded: 2024-01-15T01:00:00.000Z",
                "        Post: urn:li:share:5",
            ]
        );
    }

    #[test]
    fn aborted_names_stage_and_reason() {
        let lines = format_run_event(&PipelineEvent::Aborted {
            period: 6,
            stage: Stage::Publish,
            reason: "HTTP 401: unauthorized".into(),
        });
        assert_eq!(
            lines,
            vec!["    Aborted during publish: HTTP 401: unauthorized"]
        );
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn bundle_with_images() {
        let bundle = ContentBundle {
            period: 1,
            dir: PathBuf::from("images/week1"),
            text: "Week one: the Pi is alive.".into(),
            images: vec![
                PathBuf::from("images/week1/01-board.jpg"),
                PathBuf::from("images/week1/02-wiring.PNG"),
            ],
        };
        assert_eq!(
            format_bundle(&bundle),
            vec![
                "Week 1 (images/week1)",
                "    Text: Week one: the Pi is alive.",
                "    001 01-board.jpg (image/jpeg)",
                "    002 02-wiring.PNG (image/png)",
            ]
        );
    }

    #[test]
    fn text_only_bundle() {
        let bundle = ContentBundle {
            period: 2,
            dir: PathBuf::from("images/week2"),
            text: "Hello World".into(),
            images: vec![],
        };
        let lines = format_bundle(&bundle);
        assert_eq!(lines[2], "    No images (text-only post)");
    }

    #[test]
    fn check_error_for_missing_week() {
        let err = ContentError::PeriodDirMissing {
            period: 3,
            path: PathBuf::from("images/week3"),
        };
        let lines = format_check_error(3, &err);
        assert_eq!(lines[0], "Week 3");
        assert!(lines[1].starts_with("    No content: "));
        assert!(lines[1].ends_with("images/week3"));
    }

    #[test]
    fn check_error_for_blank_text() {
        let err = ContentError::EmptyText {
            period: 4,
            path: PathBuf::from("images/week4/content.txt"),
        };
        let lines = format_check_error(4, &err);
        assert!(lines[1].starts_with("    Error: "));
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    #[test]
    fn empty_ledger() {
        assert_eq!(
            format_ledger(Path::new("posted.json"), &[]),
            vec!["Ledger: posted.json", "No weeks published yet"]
        );
    }

    #[test]
    fn ledger_table() {
        let store = JsonFileStore::new("data/posted.json");
        let lines = format_ledger(store.path(), &[entry(1, Some("urn:li:share:1")), entry(12, None)]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Ledger: data/posted.json");
        assert_eq!(lines[1], "Week  Published                 Post");
        assert_eq!(lines[2], "   1  2024-01-15T01:00:00.000Z  urn:li:share:1");
        assert_eq!(lines[3], "  12  2024-01-15T01:00:00.000Z  -");
    }
}
