//! Analysis orchestrator — owns one session's run state and drives the pipeline.
//!
//! Flow: Idle → Uploading → Extracting → Scoring → Succeeded, with any in-flight
//! state able to move to Failed. Stages run strictly in sequence.
//!
//! Every run gets a fresh `RunId`. Events carry the id of the run that produced
//! them and are dropped unless that run is still current, so a cancelled run's
//! late responses can never touch newer state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::client::AnalysisClient;
use crate::analysis::parser;
use crate::analysis::state::{AnalysisRunState, Phase, RunEvent, RunId};
use crate::errors::AnalysisError;
use crate::extraction::{self, ExtractedResume, UploadedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Select a resume (PDF or DOCX) before starting the analysis")]
    MissingDocument,

    #[error("Enter a job description before starting the analysis")]
    MissingJobDescription,

    #[error("An analysis run is already in progress")]
    RunInProgress,

    #[error("Only a failed analysis can be retried")]
    NotFailed,
}

/// Inputs captured for one run. The pipeline works from these, not from the
/// orchestrator's (possibly edited) current inputs.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub run_id: RunId,
    pub document: UploadedDocument,
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub file_name: Option<String>,
    pub declared_type: String,
    pub size_bytes: usize,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub run_id: Option<RunId>,
    pub state: AnalysisRunState,
    pub phases: Vec<Phase>,
    pub document: Option<DocumentSummary>,
    pub has_job_description: bool,
    pub can_start: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct AnalysisOrchestrator {
    job_description: String,
    document: Option<UploadedDocument>,
    state: AnalysisRunState,
    generation: u64,
    current_run: Option<RunId>,
    phases: Vec<Phase>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    /// Last time the session was read or changed. Drives idle eviction.
    touched_at: DateTime<Utc>,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOrchestrator {
    pub fn new() -> Self {
        Self {
            job_description: String::new(),
            document: None,
            state: AnalysisRunState::Idle,
            generation: 0,
            current_run: None,
            phases: vec![Phase::Idle],
            started_at: None,
            finished_at: None,
            touched_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &AnalysisRunState {
        &self.state
    }

    pub fn set_job_description(&mut self, job_description: impl Into<String>) {
        self.job_description = job_description.into();
        self.touch();
    }

    pub fn select_document(&mut self, document: UploadedDocument) {
        self.document = Some(document);
        self.touch();
    }

    pub fn clear_document(&mut self) {
        self.document = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }

    /// Idle for longer than `ttl` as of `now`. A session with a run in flight
    /// never expires.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        !self.state.is_in_flight() && now - self.touched_at > ttl
    }

    /// Both inputs present and nothing in flight.
    pub fn can_start(&self) -> bool {
        self.document.is_some()
            && !self.job_description.trim().is_empty()
            && !self.state.is_in_flight()
    }

    /// Starts a new run. Any previous result is discarded.
    pub fn start(&mut self) -> Result<RunTicket, StartError> {
        if self.state.is_in_flight() {
            return Err(StartError::RunInProgress);
        }
        self.begin_run()
    }

    /// Restarts the whole pipeline after a failure, with the same inputs.
    pub fn retry(&mut self) -> Result<RunTicket, StartError> {
        if !matches!(self.state, AnalysisRunState::Failed { .. }) {
            return Err(StartError::NotFailed);
        }
        self.begin_run()
    }

    fn begin_run(&mut self) -> Result<RunTicket, StartError> {
        let document = self.document.clone().ok_or(StartError::MissingDocument)?;
        if self.job_description.trim().is_empty() {
            return Err(StartError::MissingJobDescription);
        }

        self.generation += 1;
        let run_id = RunId(self.generation);
        self.current_run = Some(run_id);
        self.state = AnalysisRunState::Uploading;
        self.phases = vec![Phase::Uploading];
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.touch();

        info!(
            "Starting {run_id}: {} bytes, declared type '{}'",
            document.size(),
            document.declared_type
        );

        Ok(RunTicket {
            run_id,
            document,
            job_description: self.job_description.clone(),
        })
    }

    /// Abandons the in-flight run, returning to Idle. Returns false if nothing was running.
    pub fn cancel(&mut self) -> bool {
        let Some(run_id) = self.current_run.take() else {
            return false;
        };
        info!("Cancelled {run_id} in phase {:?}", self.state.phase());
        self.state = AnalysisRunState::Idle;
        self.phases.push(Phase::Idle);
        self.finished_at = Some(Utc::now());
        self.touch();
        true
    }

    pub fn is_current(&self, run_id: RunId) -> bool {
        self.current_run == Some(run_id)
    }

    /// Applies an event from `run_id`. Stale or out-of-order events are ignored.
    pub fn apply(&mut self, run_id: RunId, event: RunEvent) -> bool {
        if !self.is_current(run_id) {
            warn!("Ignoring '{}' from stale {run_id}", event.name());
            return false;
        }

        let event_name = event.name();
        let next = match (&self.state, event) {
            (AnalysisRunState::Uploading, RunEvent::DocumentAccepted) => {
                AnalysisRunState::Extracting
            }
            (AnalysisRunState::Extracting, RunEvent::Extracted) => AnalysisRunState::Scoring,
            (AnalysisRunState::Scoring, RunEvent::Scored(parsed)) => {
                AnalysisRunState::succeeded(parsed)
            }
            (state, RunEvent::Failed(err)) if state.is_in_flight() => {
                warn!("{run_id} failed during {:?}: {err}", state.phase());
                AnalysisRunState::failed(&err)
            }
            (state, _) => {
                warn!(
                    "Ignoring '{event_name}' for {run_id} in phase {:?}",
                    state.phase()
                );
                return false;
            }
        };

        info!("{run_id}: {:?} -> {:?}", self.state.phase(), next.phase());
        self.phases.push(next.phase());
        if !next.is_in_flight() {
            self.current_run = None;
            self.finished_at = Some(Utc::now());
        }
        // The upload is only kept while a retry could still need it.
        if matches!(next, AnalysisRunState::Succeeded { .. }) {
            self.document = None;
        }
        self.state = next;
        self.touch();
        true
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: (self.generation > 0).then_some(RunId(self.generation)),
            state: self.state.clone(),
            phases: self.phases.clone(),
            document: self.document.as_ref().map(|d| DocumentSummary {
                file_name: d.file_name.clone(),
                declared_type: d.declared_type.clone(),
                size_bytes: d.size(),
            }),
            has_job_description: !self.job_description.trim().is_empty(),
            can_start: self.can_start(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline driver
// ────────────────────────────────────────────────────────────────────────────

/// Runs one ticket through extraction, cleanup, scoring and parsing, reporting
/// each step to the orchestrator. Stops as soon as the run is no longer current.
///
/// The lock is only taken between awaits, never across one.
pub async fn drive_run(
    orchestrator: &Mutex<AnalysisOrchestrator>,
    client: &AnalysisClient,
    ticket: RunTicket,
) {
    let run_id = ticket.run_id;
    if let Err(err) = run_stages(orchestrator, client, ticket).await {
        apply(orchestrator, run_id, RunEvent::Failed(err));
    }
}

async fn run_stages(
    orchestrator: &Mutex<AnalysisOrchestrator>,
    client: &AnalysisClient,
    ticket: RunTicket,
) -> Result<(), AnalysisError> {
    let RunTicket {
        run_id,
        document,
        job_description,
    } = ticket;

    document.media_type()?;
    if !apply(orchestrator, run_id, RunEvent::DocumentAccepted) {
        return Ok(());
    }

    let extracted = extract_off_thread(document).await?;
    if !apply(orchestrator, run_id, RunEvent::Extracted) {
        return Ok(());
    }

    let resume_text = client.cleanup(&extracted).await?;
    if !lock(orchestrator).is_current(run_id) {
        info!("{run_id} abandoned after cleanup; skipping scoring");
        return Ok(());
    }

    let raw = client.score(&resume_text, &job_description).await?;
    let parsed = parser::parse(&raw)?;
    apply(orchestrator, run_id, RunEvent::Scored(parsed));
    Ok(())
}

pub(crate) async fn extract_off_thread(
    document: UploadedDocument,
) -> Result<ExtractedResume, AnalysisError> {
    tokio::task::spawn_blocking(move || extraction::extract(&document))
        .await
        .map_err(|e| AnalysisError::ExtractionFailure(format!("extraction task failed: {e}")))?
}

/// Locks the orchestrator, recovering from a poisoned mutex.
pub(crate) fn lock(
    orchestrator: &Mutex<AnalysisOrchestrator>,
) -> MutexGuard<'_, AnalysisOrchestrator> {
    orchestrator.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(orchestrator: &Mutex<AnalysisOrchestrator>, run_id: RunId, event: RunEvent) -> bool {
    lock(orchestrator).apply(run_id, event)
}
