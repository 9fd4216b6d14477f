//! Report planner: turns topic, structure and research into an outline.

use crate::adapter::CompletionAdapter;
use crate::retry::retrying_call;
use tracing::info;

use super::error::{StageId, WorkflowError};
use super::prompts;
use super::state::{AgentState, ReportPlan};

/// Asks the model for a [`ReportPlan`] over the accumulated message history.
///
/// Fails with [`WorkflowError::Planning`] once the attempt budget is spent;
/// nothing downstream can run without a plan.
pub async fn plan_report(
    completion: &dyn CompletionAdapter,
    state: &AgentState,
    max_attempts: u32,
) -> Result<ReportPlan, WorkflowError> {
    info!("Calling report planner");

    let system_prompt = prompts::report_planner_prompt(&state.topic, &state.report_structure)
        .map_err(|source| WorkflowError::Prompt {
            stage: StageId::Planning,
            source,
        })?;

    let plan: ReportPlan = retrying_call(completion, &system_prompt, &state.messages, max_attempts)
        .await
        .map_err(WorkflowError::Planning)?;

    info!(
        title = %plan.title,
        sections = plan.sections.len(),
        "Report plan ready"
    );
    Ok(plan)
}
