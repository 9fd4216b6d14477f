//! The report generation workflow.
//!
//! A run moves through a fixed, linear sequence of stages:
//!
//! ```text
//! Start -> Researched -> Planned -> SectionsWritten -> Compiled
//! ```
//!
//! 1. **Topic research** runs the canned topic queries through the search adapter.
//! 2. **Planning** asks the model for a [`ReportPlan`].
//! 3. **Section authoring** runs one research-then-write sub-workflow per section,
//!    concurrently unless throttled, and merges the results in plan order.
//! 4. **Compilation** joins the sections and (optionally) has the model smooth them.
//!
//! Concurrency exists only inside section authoring. Any fatal error aborts
//! the run and no partial report is returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use docgen::adapter::{OpenAiCompletion, TavilySearch};
//! use docgen::workflow::{ReportWorkflow, WorkflowConfig};
//! use std::sync::Arc;
//!
//! let workflow = ReportWorkflow::with_config(
//!     Arc::new(TavilySearch::try_from_env()?),
//!     Arc::new(OpenAiCompletion::try_from_env()?),
//!     WorkflowConfig::from_env(),
//! );
//! let report = workflow
//!     .generate_report("WebAssembly", "1. Introduction\n2. Runtimes\n3. Outlook")
//!     .await?;
//! ```

pub mod author;
pub mod compiler;
pub mod config;
pub mod error;
pub mod journal;
pub mod planner;
pub mod prompts;
pub mod researcher;
pub mod state;

pub use author::{AuthoredSections, SectionOrchestrator, SectionOutcome, write_section};
pub use compiler::{compile_report, concatenate_report, join_sections};
pub use config::{CompileMode, MergePolicy, WorkflowConfig};
pub use error::{StageId, WorkflowError};
pub use journal::{ExecutionJournal, StageRecord};
pub use planner::plan_report;
pub use researcher::{QuerySet, research};
pub use state::{AgentState, ReportPlan, Section, SectionWriterState, StateUpdate, WorkflowStage};

use crate::adapter::{CompletionAdapter, SearchAdapter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};

/// Outcome of a completed run: the final state and what each stage recorded.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub state: AgentState,
    pub journal: ExecutionJournal,
}

impl WorkflowRun {
    /// The compiled report text.
    pub fn report(&self) -> Option<&str> {
        self.state.report.as_deref()
    }
}

/// Top-level report workflow.
///
/// Holds the adapters and the configuration; each call to [`run`](Self::run)
/// creates its own [`AgentState`], so concurrent runs share nothing but the
/// adapters.
pub struct ReportWorkflow {
    search: Arc<dyn SearchAdapter>,
    completion: Arc<dyn CompletionAdapter>,
    config: WorkflowConfig,
}

impl ReportWorkflow {
    /// Creates a workflow with the default configuration.
    pub fn new(search: Arc<dyn SearchAdapter>, completion: Arc<dyn CompletionAdapter>) -> Self {
        Self::with_config(search, completion, WorkflowConfig::default())
    }

    /// Creates a workflow with a custom configuration.
    pub fn with_config(
        search: Arc<dyn SearchAdapter>,
        completion: Arc<dyn CompletionAdapter>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            search,
            completion,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Generates a report and returns its text.
    pub async fn generate_report(
        &self,
        topic: &str,
        report_structure: &str,
    ) -> Result<String, WorkflowError> {
        let run = self.run(topic, report_structure).await?;
        run.state.report.ok_or_else(|| {
            WorkflowError::precondition(StageId::Compilation, "workflow finished without a report")
        })
    }

    /// Runs every stage in order and returns the final state with its journal.
    pub async fn run(
        &self,
        topic: &str,
        report_structure: &str,
    ) -> Result<WorkflowRun, WorkflowError> {
        async move {
            let mut state = AgentState::new(topic, report_structure);
            let mut journal = ExecutionJournal::new();

            let started = Instant::now();
            let update = self.topic_research(&state).await;
            Self::advance(&mut state, &mut journal, update, started)?;

            let started = Instant::now();
            let update = self.report_planner(&state).await?;
            Self::advance(&mut state, &mut journal, update, started)?;

            let started = Instant::now();
            let update = self.section_author_orchestrator(&state).await?;
            Self::advance(&mut state, &mut journal, update, started)?;

            let started = Instant::now();
            let update = self.report_author(&state).await?;
            Self::advance(&mut state, &mut journal, update, started)?;

            info!(
                total_ms = journal.total_elapsed_ms(),
                "Report generation complete"
            );
            Ok::<_, WorkflowError>(WorkflowRun { state, journal })
        }
        .instrument(info_span!("report_workflow", topic = %topic))
        .await
    }

    fn advance(
        state: &mut AgentState,
        journal: &mut ExecutionJournal,
        update: StateUpdate,
        started: Instant,
    ) -> Result<(), WorkflowError> {
        state.apply(update)?;
        journal.record_stage(StageRecord::from_state(state, started.elapsed()));
        info!(stage = %state.stage, messages = state.messages.len(), "Stage complete");
        Ok(())
    }

    async fn topic_research(&self, state: &AgentState) -> StateUpdate {
        info!("Performing initial topic research");
        let message = research(
            self.search.as_ref(),
            QuerySet::Topic {
                topic: &state.topic,
            },
            self.config.queries_per_section,
        )
        .instrument(info_span!("topic_research"))
        .await;

        StateUpdate::Researched {
            messages: vec![message],
        }
    }

    async fn report_planner(&self, state: &AgentState) -> Result<StateUpdate, WorkflowError> {
        let plan = plan_report(self.completion.as_ref(), state, self.config.max_llm_attempts)
            .instrument(info_span!("report_planner"))
            .await?;
        Ok(StateUpdate::Planned { plan })
    }

    async fn section_author_orchestrator(
        &self,
        state: &AgentState,
    ) -> Result<StateUpdate, WorkflowError> {
        let authored =
            SectionOrchestrator::new(self.search.as_ref(), self.completion.as_ref(), &self.config)
                .author_sections(state)
                .instrument(info_span!("section_author_orchestrator"))
                .await?;

        Ok(StateUpdate::SectionsWritten {
            sections: authored.sections,
            messages: authored.messages,
        })
    }

    async fn report_author(&self, state: &AgentState) -> Result<StateUpdate, WorkflowError> {
        let plan = state.plan.as_ref().ok_or_else(|| {
            WorkflowError::precondition(StageId::Compilation, "report plan is not set")
        })?;

        let report = compile_report(
            self.completion.as_ref(),
            plan,
            self.config.compile_mode,
            self.config.max_llm_attempts,
        )
        .instrument(info_span!("report_author"))
        .await?;

        Ok(StateUpdate::Compiled { report })
    }
}
