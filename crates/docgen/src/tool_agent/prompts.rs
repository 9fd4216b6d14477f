use crate::workflow::prompts::render;
use minijinja::context;
use serde::{Deserialize, Serialize};

/// Reply protocol appended to every persona prompt.
const TURN_PROTOCOL: &str = r##"
{% if tools %}
## Tools
{{ tools }}
{% endif %}
---

Reply with a JSON object:

```json
{
  "content": "Your answer, or an empty string while you are still calling tools",
  "tool_calls": [
    { "id": "call_1", "name": "tool name", "arguments": { } }
  ]
}
```

Leave `tool_calls` empty once you have everything you need; `content` is then your final answer.
"##;

/// Ready-made system prompts for the tool-calling agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPersona {
    #[default]
    General,
    Research,
    Code,
    DataAnalyst,
    ContentCreator,
}

impl AgentPersona {
    fn template(&self) -> &'static str {
        match self {
            AgentPersona::General => {
                "You are a helpful AI agent.\n\n\
                 User input: {{ user_input }}\n\n\
                 Your task is to help the user with their request. You can use tools to gather information if needed.\n\n\
                 Please be helpful, accurate, and concise in your responses."
            }
            AgentPersona::Research => {
                "You are a research assistant.\n\n\
                 User input: {{ user_input }}\n\n\
                 Your task is to research the topic thoroughly and provide comprehensive information.\n\
                 Use the search tool to find current, relevant information.\n\
                 Organize your findings in a clear, structured way."
            }
            AgentPersona::Code => {
                "You are a programming assistant.\n\n\
                 User input: {{ user_input }}\n\n\
                 Your task is to help with programming questions and code problems.\n\
                 Provide clear, well-commented code examples.\n\
                 Explain your reasoning and suggest best practices."
            }
            AgentPersona::DataAnalyst => {
                "You are a data analyst.\n\n\
                 User input: {{ user_input }}\n\n\
                 Your task is to help analyze data and provide insights.\n\
                 Use tools to gather relevant data if needed.\n\
                 Present your findings in a clear, actionable way."
            }
            AgentPersona::ContentCreator => {
                "You are a content creator.\n\n\
                 User input: {{ user_input }}\n\n\
                 Your task is to create engaging, informative content.\n\
                 Research the topic thoroughly to ensure accuracy.\n\
                 Write in a clear, engaging style appropriate for the target audience."
            }
        }
    }

    /// Renders the system prompt for `user_input`, listing `tools` when non-empty.
    pub fn system_prompt(&self, user_input: &str, tools: &str) -> Result<String, minijinja::Error> {
        let template = format!("{}\n{}", self.template(), TURN_PROTOCOL);
        render(&template, context! { user_input => user_input, tools => tools })
    }
}
