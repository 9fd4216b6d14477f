use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::state::{AgentState, WorkflowStage};

/// Captures the stages a workflow run went through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionJournal {
    /// Recorded stages in execution order.
    pub stages: Vec<StageRecord>,
}

impl ExecutionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage record to the journal.
    pub fn record_stage(&mut self, record: StageRecord) {
        self.stages.push(record);
    }

    /// The last stage reached, or `Start` for an empty journal.
    pub fn last_stage(&self) -> WorkflowStage {
        self.stages
            .last()
            .map(|record| record.stage)
            .unwrap_or(WorkflowStage::Start)
    }

    /// Total time spent across recorded stages.
    pub fn total_elapsed_ms(&self) -> u64 {
        self.stages.iter().map(|record| record.elapsed_ms).sum()
    }
}

/// Snapshot taken when a stage completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: WorkflowStage,
    pub elapsed_ms: u64,
    pub message_count: usize,
    pub recorded_at_ms: u64,
}

impl StageRecord {
    /// Builds a record from the state right after a stage was applied.
    pub fn from_state(state: &AgentState, elapsed: Duration) -> Self {
        Self::with_timestamp(state, elapsed, current_timestamp_ms())
    }

    /// Same as `from_state` but with explicit timestamp control (useful for deterministic tests).
    pub fn with_timestamp(state: &AgentState, elapsed: Duration, recorded_at_ms: u64) -> Self {
        Self {
            stage: state.stage,
            elapsed_ms: elapsed.as_millis() as u64,
            message_count: state.messages.len(),
            recorded_at_ms,
        }
    }
}

/// Returns the current system time in milliseconds since UNIX_EPOCH.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
