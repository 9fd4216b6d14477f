//! Section authoring: one research-then-write sub-workflow per planned section.
//!
//! The [`SectionOrchestrator`] copies what each section needs into a
//! [`SectionWriterState`], runs the sub-workflows (all at once, or one at a
//! time when throttled), and merges the results back in plan order. Sub-workflows
//! never touch the shared state; they return their section and the messages
//! they added.

use crate::adapter::{CompletionAdapter, SearchAdapter};
use crate::message::Message;
use crate::retry::retrying_call;
use futures::future::join_all;
use tracing::{Instrument, debug, info, info_span};

use super::config::{MergePolicy, WorkflowConfig};
use super::error::{StageId, WorkflowError};
use super::prompts;
use super::researcher::{QuerySet, research};
use super::state::{AgentState, Section, SectionWriterState};

/// What one section sub-workflow hands back.
#[derive(Debug, Clone)]
pub struct SectionOutcome {
    /// Plan position of the section.
    pub index: usize,
    /// The section with its content written.
    pub section: Section,
    /// Messages the sub-workflow appended to its own copy of the log.
    pub new_messages: Vec<Message>,
}

/// Result of authoring every section of a plan.
#[derive(Debug, Clone)]
pub struct AuthoredSections {
    /// Written sections, in plan order.
    pub sections: Vec<Section>,
    /// Message deltas selected by the merge policy, in plan order.
    pub messages: Vec<Message>,
}

/// Runs the two stages of one section: research, then writing.
///
/// The writer sees the inherited log plus this section's research. Fails with
/// [`WorkflowError::SectionWriting`] when the writer's retry budget is spent.
pub async fn write_section(
    search: &dyn SearchAdapter,
    completion: &dyn CompletionAdapter,
    mut state: SectionWriterState,
    config: &WorkflowConfig,
) -> Result<SectionOutcome, WorkflowError> {
    info!(section = %state.section.name, "Researching section");
    let research_message = research(
        search,
        QuerySet::Section {
            section: &state.section.name,
            topic: &state.topic,
        },
        config.queries_per_section,
    )
    .await;
    state.messages.push(research_message.clone());

    info!(section = %state.section.name, "Writing section");
    let system_prompt = prompts::section_writer_prompt(&state.section.name, &state.topic)
        .map_err(|source| WorkflowError::Prompt {
            stage: StageId::Section {
                index: state.index,
                name: state.section.name.clone(),
            },
            source,
        })?;

    let content: String = retrying_call(
        completion,
        &system_prompt,
        &state.messages,
        config.max_llm_attempts,
    )
    .await
    .map_err(|source| WorkflowError::SectionWriting {
        index: state.index,
        name: state.section.name.clone(),
        source,
    })?;

    state.section.content = content;
    debug!(section = %state.section.name, chars = state.section.content.len(), "Section written");

    Ok(SectionOutcome {
        index: state.index,
        section: state.section,
        new_messages: vec![research_message],
    })
}

/// Fans out section sub-workflows and merges their results.
pub struct SectionOrchestrator<'a> {
    search: &'a dyn SearchAdapter,
    completion: &'a dyn CompletionAdapter,
    config: &'a WorkflowConfig,
}

impl<'a> SectionOrchestrator<'a> {
    pub fn new(
        search: &'a dyn SearchAdapter,
        completion: &'a dyn CompletionAdapter,
        config: &'a WorkflowConfig,
    ) -> Self {
        Self {
            search,
            completion,
            config,
        }
    }

    /// Writes every section of `state.plan`.
    ///
    /// The concurrency mode is read from the configuration once, here. Any
    /// section failure fails the whole stage; when several sections fail, the
    /// first one in plan order is reported.
    pub async fn author_sections(
        &self,
        state: &AgentState,
    ) -> Result<AuthoredSections, WorkflowError> {
        let plan = state.plan.as_ref().ok_or_else(|| {
            WorkflowError::precondition(StageId::SectionAuthoring, "report plan is not set")
        })?;

        let throttled = self.config.throttle_section_authoring;
        info!(
            sections = plan.sections.len(),
            throttled, "Orchestrating the section authoring process"
        );

        let writers = plan.sections.iter().enumerate().map(|(index, section)| {
            debug!(index, section = %section.name, "Creating section writer");
            let writer_state = SectionWriterState::new(
                index,
                section.clone(),
                &state.topic,
                state.messages.clone(),
            );
            let span = info_span!("section_writer", index, section = %section.name);
            write_section(self.search, self.completion, writer_state, self.config).instrument(span)
        });

        let results = if throttled {
            let mut results = Vec::with_capacity(plan.sections.len());
            for writer in writers {
                let result = writer.await;
                let failed = result.is_err();
                results.push(result);
                if failed {
                    break;
                }
            }
            results
        } else {
            join_all(writers).await
        };

        let mut outcomes = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        outcomes.sort_by_key(|outcome| outcome.index);

        info!("Finished all sections");
        Ok(merge_outcomes(outcomes, self.config.merge_policy))
    }
}

/// Folds section outcomes (already in plan order) into one result.
fn merge_outcomes(outcomes: Vec<SectionOutcome>, policy: MergePolicy) -> AuthoredSections {
    let mut sections = Vec::with_capacity(outcomes.len());
    let mut deltas = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        sections.push(outcome.section);
        deltas.push(outcome.new_messages);
    }

    let messages = match policy {
        MergePolicy::AllSections => deltas.into_iter().flatten().collect(),
        MergePolicy::LastSectionOnly => deltas.pop().unwrap_or_default(),
    };

    AuthoredSections { sections, messages }
}
