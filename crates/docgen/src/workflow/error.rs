//! Error types for the report workflow.

use crate::retry::RetryError;
use std::fmt;
use thiserror::Error;

use super::state::WorkflowStage;

/// Identifies the stage a fatal error came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageId {
    /// Building adapters and configuration before the run starts.
    Setup,
    Research,
    Planning,
    /// The section orchestrator as a whole.
    SectionAuthoring,
    /// One section's research-then-write sub-workflow.
    Section { index: usize, name: String },
    Compilation,
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageId::Setup => f.write_str("setup"),
            StageId::Research => f.write_str("research"),
            StageId::Planning => f.write_str("planning"),
            StageId::SectionAuthoring => f.write_str("section authoring"),
            StageId::Section { index, name } => write!(f, "section {} '{}'", index, name),
            StageId::Compilation => f.write_str("compilation"),
        }
    }
}

impl From<WorkflowStage> for StageId {
    /// Maps a workflow position to the stage that produces it.
    fn from(stage: WorkflowStage) -> Self {
        match stage {
            WorkflowStage::Start | WorkflowStage::Researched => StageId::Research,
            WorkflowStage::Planned => StageId::Planning,
            WorkflowStage::SectionsWritten => StageId::SectionAuthoring,
            WorkflowStage::Compiled => StageId::Compilation,
        }
    }
}

/// Fatal errors of a report generation run.
///
/// Any of these aborts the whole run; no partial report is returned.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The planner could not obtain a usable outline.
    #[error("Report planning failed: {0}")]
    Planning(#[source] RetryError),

    /// A section's writer could not obtain usable prose.
    #[error("Writing section {index} '{name}' failed: {source}")]
    SectionWriting {
        index: usize,
        name: String,
        source: RetryError,
    },

    /// The final compilation call failed.
    #[error("Report compilation failed: {0}")]
    Compilation(#[source] RetryError),

    /// A stage ran without what it requires. This is a sequencing bug, never retried.
    #[error("Precondition violated in {stage}: {reason}")]
    Precondition { stage: StageId, reason: String },

    /// A fixed prompt template failed to render.
    #[error("Failed to render {stage} prompt: {source}")]
    Prompt {
        stage: StageId,
        source: minijinja::Error,
    },

    /// The workflow could not be set up.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WorkflowError {
    /// Creates a precondition violation for `stage`.
    pub fn precondition(stage: StageId, reason: impl Into<String>) -> Self {
        Self::Precondition {
            stage,
            reason: reason.into(),
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> StageId {
        match self {
            WorkflowError::Planning(_) => StageId::Planning,
            WorkflowError::SectionWriting { index, name, .. } => StageId::Section {
                index: *index,
                name: name.clone(),
            },
            WorkflowError::Compilation(_) => StageId::Compilation,
            WorkflowError::Precondition { stage, .. } | WorkflowError::Prompt { stage, .. } => {
                stage.clone()
            }
            WorkflowError::Configuration(_) => StageId::Setup,
        }
    }

    /// Returns `true` if the failure came from an exhausted retry budget.
    pub fn is_retry_exhausted(&self) -> bool {
        match self {
            WorkflowError::Planning(source)
            | WorkflowError::Compilation(source)
            | WorkflowError::SectionWriting { source, .. } => source.is_exhausted(),
            _ => false,
        }
    }
}
