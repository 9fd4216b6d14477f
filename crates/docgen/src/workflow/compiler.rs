//! Report compiler: joins written sections into the final report.

use crate::adapter::CompletionAdapter;
use crate::message::Message;
use crate::retry::retrying_call;
use tracing::info;

use super::config::CompileMode;
use super::error::{StageId, WorkflowError};
use super::prompts::REPORT_COMPILER_INSTRUCTIONS;
use super::state::ReportPlan;

/// Joins sections as `## {name}\n{content}` blocks separated by blank lines.
pub fn join_sections(plan: &ReportPlan) -> String {
    plan.sections
        .iter()
        .map(|section| format!("## {}\n{}", section.name, section.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the report without a model call: the title as a level-one heading,
/// then the joined sections. Same plan in, same bytes out.
pub fn concatenate_report(plan: &ReportPlan) -> String {
    format!("# {}\n\n{}", plan.title, join_sections(plan))
}

/// Produces the final report text from a fully written plan.
///
/// Refuses to run while any section is still empty.
pub async fn compile_report(
    completion: &dyn CompletionAdapter,
    plan: &ReportPlan,
    mode: CompileMode,
    max_attempts: u32,
) -> Result<String, WorkflowError> {
    let unwritten = plan.unwritten_sections();
    if !unwritten.is_empty() {
        return Err(WorkflowError::precondition(
            StageId::Compilation,
            format!("sections without content: {}", unwritten.join(", ")),
        ));
    }

    match mode {
        CompileMode::Concatenate => {
            info!("Concatenating the report");
            Ok(concatenate_report(plan))
        }
        CompileMode::LlmSmoothing => {
            info!("Authoring the report");
            let messages = [Message::user(format!(
                "Compile this into a final report:\n\n{}",
                join_sections(plan)
            ))];
            retrying_call(completion, REPORT_COMPILER_INSTRUCTIONS, &messages, max_attempts)
                .await
                .map_err(WorkflowError::Compilation)
        }
    }
}
