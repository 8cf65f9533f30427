//! # Weekly Post
//!
//! Publishes one folder of text and images to LinkedIn per week, on a cron
//! schedule, exactly once per week.
//!
//! # Architecture: One Pipeline, Two Triggers
//!
//! ```text
//! images/week3/  ─┐
//!                 ├─▶ check ledger ─▶ resolve ─▶ upload ─▶ publish ─▶ record ─▶ posted.json
//! posted.json    ─┘
//! ```
//!
//! `run --week N` and `schedule` both end in the same
//! [`pipeline::Pipeline::run_once`]. The ledger is consulted before anything
//! else and written only after the platform confirms the post, so a period is
//! either published and recorded, or untouched and retried next time.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ledger`] | Durable record of published weeks (`posted.json`) behind the `LedgerStore` trait |
//! | [`content`] | Resolves a week number to its text and ordered images |
//! | [`api`] | `Platform` trait and the `reqwest` client for the three LinkedIn calls |
//! | [`upload`] | Register-then-transfer for each image, fail-fast |
//! | [`publish`] | Builds and submits the post payload |
//! | [`pipeline`] | The run state machine and its progress events |
//! | [`schedule`] | Cron parsing, ISO week numbering, the scheduled loop |
//! | [`config`] | `config.toml` loading and validation, credentials from the environment |
//! | [`output`] | CLI output formatting |
//! | [`telemetry`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Generic Seams, No Trait Objects
//!
//! The pipeline is generic over its platform, content source and ledger store.
//! Production wires `HttpPlatform`, `ContentDir` and `JsonFileStore`; tests
//! swap in recording doubles without any network or mocking framework.
//!
//! ## No Retries
//!
//! A failed run leaves no trace in the ledger, and the next firing tries the
//! whole week again. Retrying individual calls would risk duplicate posts when
//! a response is lost after the platform already acted.

pub mod api;
pub mod config;
pub mod content;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod schedule;
pub mod telemetry;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
