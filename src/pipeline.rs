//! Publish orchestration: one period, start to finish.
//!
//! ```text
//! Idle → CheckLedger → ResolveContent → UploadAssets → Publish → RecordLedger → Done
//!              │              │               │            │            │
//!              └──────────────┴───────┬───────┴────────────┴────────────┘
//!                                     ▼
//!                                  Aborted
//! ```
//!
//! A period already in the ledger short-circuits to `Done` before any content
//! or network access. Every other failure aborts the run. Nothing before
//! `RecordLedger` writes the ledger, so an aborted period is picked up again
//! by the next trigger.
//!
//! A failure in `RecordLedger` itself is the one case where the post is live
//! but unrecorded; it is reported as [`PipelineError::Storage`] and a re-run
//! will post again.
//!
//! ## Progress
//!
//! Transitions are logged with `tracing`. When an event channel is attached,
//! each one is also sent as a [`PipelineEvent`] for the CLI to render.

use crate::api::{AssetHandle, Platform};
use crate::content::{ContentError, ContentSource};
use crate::ledger::{Ledger, LedgerEntry, LedgerError, LedgerStore};
use crate::publish::{PostStyle, PublishError, publish};
use crate::upload::{UploadError, upload_assets};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("week must be 1 or greater")]
    InvalidPeriod,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Storage(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    CheckLedger,
    ResolveContent,
    UploadAssets,
    Publish,
    RecordLedger,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::CheckLedger => "check ledger",
            Stage::ResolveContent => "resolve content",
            Stage::UploadAssets => "upload assets",
            Stage::Publish => "publish",
            Stage::RecordLedger => "record ledger",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Scheduled,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Manual => f.write_str("manual"),
            Trigger::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Progress notifications sent during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started {
        period: u32,
        trigger: Trigger,
    },
    StageEntered {
        period: u32,
        stage: Stage,
    },
    AlreadyPublished {
        entry: LedgerEntry,
    },
    ContentResolved {
        period: u32,
        dir: PathBuf,
        text_chars: usize,
        images: usize,
    },
    ImageUploaded {
        index: usize,
        total: usize,
        path: PathBuf,
        asset: AssetHandle,
    },
    Published {
        period: u32,
        post_id: Option<String>,
    },
    Recorded {
        entry: LedgerEntry,
    },
    Aborted {
        period: u32,
        stage: Stage,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The ledger already held this period; nothing was done.
    AlreadyPublished { period: u32 },
    /// A post was created and recorded.
    Published(LedgerEntry),
}

pub struct Pipeline<P, C, S> {
    platform: P,
    content: C,
    store: S,
    style: PostStyle,
    events: Option<Sender<PipelineEvent>>,
    clock: fn() -> DateTime<Utc>,
}

impl<P: Platform, C: ContentSource, S: LedgerStore> Pipeline<P, C, S> {
    pub fn new(platform: P, content: C, store: S) -> Self {
        Self {
            platform,
            content,
            store,
            style: PostStyle::default(),
            events: None,
            clock: Utc::now,
        }
    }

    pub fn with_style(mut self, style: PostStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_events(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Source of the `published_at` timestamp.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publish `period` unless the ledger already has it.
    pub async fn run_once(&self, period: u32, trigger: Trigger) -> Result<RunOutcome, PipelineError> {
        if period == 0 {
            return Err(PipelineError::InvalidPeriod);
        }
        info!(week = period, %trigger, "run started");
        self.emit(PipelineEvent::Started { period, trigger });

        let mut stage = Stage::Idle;
        let result = self.advance(period, &mut stage).await;

        match &result {
            Ok(RunOutcome::Published(entry)) => {
                info!(week = period, post_id = ?entry.remote_post_id, "run complete");
            }
            Ok(RunOutcome::AlreadyPublished { .. }) => {}
            Err(e) => {
                let failed_at = stage;
                self.enter(period, &mut stage, Stage::Aborted);
                warn!(week = period, stage = %failed_at, error = %e, "run aborted");
                self.emit(PipelineEvent::Aborted {
                    period,
                    stage: failed_at,
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn advance(&self, period: u32, stage: &mut Stage) -> Result<RunOutcome, PipelineError> {
        self.enter(period, stage, Stage::CheckLedger);
        let mut ledger = Ledger::open(&self.store)?;
        if let Some(entry) = ledger.get(period) {
            info!(week = period, "already published, skipping");
            self.emit(PipelineEvent::AlreadyPublished {
                entry: entry.clone(),
            });
            self.enter(period, stage, Stage::Done);
            return Ok(RunOutcome::AlreadyPublished { period });
        }

        self.enter(period, stage, Stage::ResolveContent);
        let bundle = self.content.resolve(period)?;
        self.emit(PipelineEvent::ContentResolved {
            period,
            dir: bundle.dir.clone(),
            text_chars: bundle.text.chars().count(),
            images: bundle.images.len(),
        });

        self.enter(period, stage, Stage::UploadAssets);
        let assets = upload_assets(&self.platform, &bundle.images, self.events.as_ref()).await?;

        self.enter(period, stage, Stage::Publish);
        let published = publish(&self.platform, &bundle.text, &assets, &self.style).await?;
        self.emit(PipelineEvent::Published {
            period,
            post_id: published.remote_post_id.clone(),
        });

        self.enter(period, stage, Stage::RecordLedger);
        let entry = LedgerEntry::new(period, (self.clock)(), published.remote_post_id);
        if let Err(e) = ledger.append(entry.clone()) {
            warn!(
                week = period,
                post_id = ?entry.remote_post_id,
                "post is live but could not be recorded"
            );
            return Err(e.into());
        }
        self.emit(PipelineEvent::Recorded {
            entry: entry.clone(),
        });

        self.enter(period, stage, Stage::Done);
        Ok(RunOutcome::Published(entry))
    }

    fn enter(&self, period: u32, stage: &mut Stage, next: Stage) {
        debug!(week = period, from = %stage, to = %next, "stage");
        *stage = next;
        self.emit(PipelineEvent::StageEntered {
            period,
            stage: next,
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}
