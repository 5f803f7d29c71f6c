use serde::{Deserialize, Serialize};

use crate::analysis::parser::ParsedAnalysis;
use crate::analysis::record::{AnalysisRecord, SchemaWarning};
use crate::errors::{AnalysisError, ErrorKind};

/// Identifies one analysis run within a session. Monotonic per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// State tag without payload, used for the per-run phase log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Uploading,
    Extracting,
    Scoring,
    Succeeded,
    Failed,
}

/// Progress of the session's analysis, as shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisRunState {
    Idle,
    Uploading,
    Extracting,
    Scoring,
    Succeeded {
        analysis: Box<AnalysisRecord>,
        warnings: Vec<SchemaWarning>,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl AnalysisRunState {
    pub fn phase(&self) -> Phase {
        match self {
            AnalysisRunState::Idle => Phase::Idle,
            AnalysisRunState::Uploading => Phase::Uploading,
            AnalysisRunState::Extracting => Phase::Extracting,
            AnalysisRunState::Scoring => Phase::Scoring,
            AnalysisRunState::Succeeded { .. } => Phase::Succeeded,
            AnalysisRunState::Failed { .. } => Phase::Failed,
        }
    }

    /// True while a run owns the state and can still move it.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            AnalysisRunState::Uploading | AnalysisRunState::Extracting | AnalysisRunState::Scoring
        )
    }

    pub fn failed(err: &AnalysisError) -> Self {
        AnalysisRunState::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn succeeded(parsed: ParsedAnalysis) -> Self {
        AnalysisRunState::Succeeded {
            analysis: Box::new(parsed.record),
            warnings: parsed.warnings,
        }
    }
}

/// Something that happened inside a run. Applied by the orchestrator only if the
/// run is still current and the transition is legal.
#[derive(Debug)]
pub enum RunEvent {
    DocumentAccepted,
    Extracted,
    Scored(ParsedAnalysis),
    Failed(AnalysisError),
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::DocumentAccepted => "document_accepted",
            RunEvent::Extracted => "extracted",
            RunEvent::Scored(_) => "scored",
            RunEvent::Failed(_) => "failed",
        }
    }
}
