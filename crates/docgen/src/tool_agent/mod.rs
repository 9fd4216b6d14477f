//! A generic tool-calling agent.
//!
//! Two states alternate: `agent` asks the model for an [`AgentTurn`]; when the
//! turn carries tool calls, `tools` executes them, appends one tool message per
//! call, and hands control back to `agent`. A turn without tool calls ends the
//! run with its content as the answer.
//!
//! ```rust,ignore
//! use docgen::tool_agent::{AgentPersona, ToolAgent};
//!
//! let agent = ToolAgent::new(search, completion).with_persona(AgentPersona::Research);
//! let run = agent.run("Summarize this week's Rust releases").await?;
//! println!("{}", run.answer);
//! ```

pub mod prompts;
pub mod tools;

pub use prompts::AgentPersona;
pub use tools::{Tool, ToolError, ToolSet};

use crate::adapter::{CompletionAdapter, OutputShape, SearchAdapter};
use crate::message::Message;
use crate::retry::{
    MAX_LLM_ATTEMPTS, RetryError, StructuredOutput, parse_json_output, retrying_call,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};

pub const DEFAULT_MAX_TURNS: u32 = 8;

#[derive(Debug, Error)]
pub enum ToolAgentError {
    #[error("Model call failed: {0}")]
    Model(#[source] RetryError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Failed to render the agent prompt: {0}")]
    Prompt(#[from] minijinja::Error),

    #[error("Agent did not finish within {max_turns} turns")]
    TurnLimit { max_turns: u32 },
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

/// What the model returns on each `agent` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentTurn {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl AgentTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Text recorded in the log for this turn, listing any tool calls.
    fn transcript(&self) -> String {
        let mut lines = Vec::with_capacity(self.tool_calls.len() + 1);
        if !self.content.trim().is_empty() {
            lines.push(self.content.clone());
        }
        lines.extend(
            self.tool_calls
                .iter()
                .map(|call| format!("[call {}] {}({})", call.id, call.name, call.arguments)),
        );
        lines.join("\n")
    }
}

impl StructuredOutput for AgentTurn {
    fn output_shape() -> OutputShape {
        OutputShape::json::<AgentTurn>()
    }

    fn from_output(value: JsonValue) -> Result<Self, String> {
        let turn: AgentTurn = parse_json_output(value)?;
        if turn.content.trim().is_empty() && turn.tool_calls.is_empty() {
            return Err("turn has neither content nor tool calls".to_string());
        }
        Ok(turn)
    }
}

/// Result of a finished agent run.
#[derive(Debug, Clone)]
pub struct ToolAgentRun {
    /// Content of the final turn.
    pub answer: String,
    /// Everything appended to the log, in order.
    pub messages: Vec<Message>,
    /// Number of `agent` steps taken.
    pub turns: u32,
}

pub struct ToolAgent {
    search: Arc<dyn SearchAdapter>,
    completion: Arc<dyn CompletionAdapter>,
    tools: ToolSet,
    persona: AgentPersona,
    max_turns: u32,
    max_llm_attempts: u32,
}

impl ToolAgent {
    /// Creates an agent with every tool registered and the general persona.
    pub fn new(search: Arc<dyn SearchAdapter>, completion: Arc<dyn CompletionAdapter>) -> Self {
        Self {
            search,
            completion,
            tools: ToolSet::all(),
            persona: AgentPersona::default(),
            max_turns: DEFAULT_MAX_TURNS,
            max_llm_attempts: MAX_LLM_ATTEMPTS,
        }
    }

    pub fn with_persona(mut self, persona: AgentPersona) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_max_llm_attempts(mut self, max_llm_attempts: u32) -> Self {
        self.max_llm_attempts = max_llm_attempts;
        self
    }

    /// Runs the agent/tools loop until the model answers without tool calls.
    pub async fn run(&self, user_input: &str) -> Result<ToolAgentRun, ToolAgentError> {
        let system_prompt = self.persona.system_prompt(user_input, &self.tools.describe())?;
        let mut messages: Vec<Message> = Vec::new();

        for turn_number in 1..=self.max_turns {
            info!(turn = turn_number, "Calling model");
            let turn: AgentTurn = retrying_call(
                self.completion.as_ref(),
                &system_prompt,
                &messages,
                self.max_llm_attempts,
            )
            .await
            .map_err(ToolAgentError::Model)?;

            messages.push(Message::assistant(turn.transcript()));

            if !turn.has_tool_calls() {
                info!(turns = turn_number, "Agent finished");
                return Ok(ToolAgentRun {
                    answer: turn.content,
                    messages,
                    turns: turn_number,
                });
            }

            let outputs = self
                .execute_tools(&turn.tool_calls)
                .instrument(info_span!("tools", turn = turn_number))
                .await?;
            messages.extend(outputs);
        }

        warn!(max_turns = self.max_turns, "Agent hit the turn limit");
        Err(ToolAgentError::TurnLimit {
            max_turns: self.max_turns,
        })
    }

    /// Executes calls in order. A failing tool becomes an error message for
    /// the model; an unknown or unregistered name stops the run.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Result<Vec<Message>, ToolError> {
        let mut outputs = Vec::with_capacity(calls.len());

        for call in calls {
            let tool = self.tools.resolve(&call.name)?;
            info!(tool = %tool, id = %call.id, "Executing tool call");

            let content = match tool.execute(self.search.as_ref(), &call.arguments).await {
                Ok(output) => output,
                Err(err) => {
                    warn!(tool = %tool, error = %err, "Tool call failed");
                    format!("Error: {}", err)
                }
            };
            outputs.push(Message::tool(tool.name(), content));
        }

        Ok(outputs)
    }
}
