//! `docgen` - research-and-write report generation over pluggable LLM and
//! web-search backends.
//!
//! Given a topic and a free-text report structure, the [`workflow`] researches
//! the topic, asks a model for a plan of named sections, researches and writes
//! every section (concurrently unless throttled), and compiles the sections
//! into one report.
//!
//! The crate is organized around two seams in [`adapter`]:
//!
//! - [`adapter::SearchAdapter`]: one textual web search.
//! - [`adapter::CompletionAdapter`]: one structured completion that may
//!   yield "no result".
//!
//! Everything model-facing goes through [`retry::retrying_call`], which turns
//! empty or malformed completions into bounded retries.
//!
//! [`tool_agent`] hosts a smaller, generic agent that loops between the model
//! and a closed set of tools.

pub mod adapter;
pub mod extract;
pub mod message;
pub mod observability;
pub mod retry;
pub mod tool_agent;
pub mod workflow;

pub use adapter::{CompletionAdapter, CompletionError, OutputShape, SearchAdapter, SearchError};
pub use message::{Message, Role};
pub use retry::{MAX_LLM_ATTEMPTS, RetryError, retrying_call};
pub use workflow::{ReportWorkflow, WorkflowConfig, WorkflowError};

#[cfg(feature = "openai-api")]
pub use adapter::OpenAiCompletion;

#[cfg(feature = "tavily-search")]
pub use adapter::TavilySearch;

/// Generates a report with the default HTTP adapters configured from the
/// environment (`OPENAI_API_KEY`, `TAVILY_API_KEY`, `THROTTLE_LLM_CALLS`).
#[cfg(all(feature = "openai-api", feature = "tavily-search"))]
pub async fn generate_report(topic: &str, report_structure: &str) -> Result<String, WorkflowError> {
    use std::sync::Arc;

    let search =
        TavilySearch::try_from_env().map_err(|e| WorkflowError::Configuration(e.to_string()))?;
    let completion =
        OpenAiCompletion::try_from_env().map_err(|e| WorkflowError::Configuration(e.to_string()))?;

    ReportWorkflow::with_config(Arc::new(search), Arc::new(completion), WorkflowConfig::from_env())
        .generate_report(topic, report_structure)
        .await
}
