//! Mock adapters shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use docgen::adapter::{CompletionAdapter, CompletionError, OutputShape, SearchAdapter, SearchError};
use docgen::message::Message;
use docgen::workflow::prompts::REPORT_COMPILER_INSTRUCTIONS;
use serde_json::{Value as JsonValue, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Mock search
// ============================================================================

/// Search that answers `result for {query}`, failing any query containing one
/// of the configured fragments.
#[derive(Clone, Default)]
pub struct MockSearch {
    failing_fragments: Vec<String>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.failing_fragments.push(fragment.into());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchAdapter for MockSearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self
            .failing_fragments
            .iter()
            .any(|fragment| query.contains(fragment.as_str()))
        {
            return Err(SearchError::failed(query, "mock outage"));
        }
        Ok(format!("result for {}", query))
    }
}

// ============================================================================
// Mock completion
// ============================================================================

/// A section-writer call as seen by the mock: which section, when it started
/// and ended, and the messages it was given.
#[derive(Debug, Clone)]
pub struct WriterCall {
    pub section: String,
    pub started: Instant,
    pub finished: Instant,
    pub messages: Vec<Message>,
}

/// Completion adapter that recognizes the workflow's three prompts.
///
/// - planner: returns a plan with `sections`
/// - section writer: returns `Body of {section}` after the section's delay
/// - compiler: returns `Smoothed report:` followed by the user message
#[derive(Clone)]
pub struct MockCompletion {
    title: String,
    sections: Vec<String>,
    delays: HashMap<String, Duration>,
    silent_sections: HashSet<String>,
    empty_plans: u32,
    pub planner_calls: Arc<Mutex<u32>>,
    pub compiler_calls: Arc<Mutex<Vec<Vec<Message>>>>,
    pub writer_calls: Arc<Mutex<Vec<WriterCall>>>,
    pub planner_messages: Arc<Mutex<Vec<Message>>>,
}

impl MockCompletion {
    pub fn new(title: impl Into<String>, sections: &[&str]) -> Self {
        Self {
            title: title.into(),
            sections: sections.iter().map(|s| s.to_string()).collect(),
            delays: HashMap::new(),
            silent_sections: HashSet::new(),
            empty_plans: 0,
            planner_calls: Arc::new(Mutex::new(0)),
            compiler_calls: Arc::new(Mutex::new(Vec::new())),
            writer_calls: Arc::new(Mutex::new(Vec::new())),
            planner_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, section: &str, delay: Duration) -> Self {
        self.delays.insert(section.to_string(), delay);
        self
    }

    /// The writer for `section` never produces content.
    pub fn silent_for(mut self, section: &str) -> Self {
        self.silent_sections.insert(section.to_string());
        self
    }

    /// The planner returns nothing for its first `count` calls.
    pub fn with_empty_plans(mut self, count: u32) -> Self {
        self.empty_plans = count;
        self
    }

    pub fn writer_calls(&self) -> Vec<WriterCall> {
        self.writer_calls.lock().unwrap().clone()
    }

    pub fn planner_call_count(&self) -> u32 {
        *self.planner_calls.lock().unwrap()
    }

    fn plan(&self) -> JsonValue {
        json!({
            "title": self.title,
            "sections": self
                .sections
                .iter()
                .map(|name| json!({ "name": name, "content": "" }))
                .collect::<Vec<_>>(),
        })
    }
}

/// Reads the section name out of the rendered section-writer prompt.
fn section_from_prompt(system_prompt: &str) -> Option<String> {
    let mut lines = system_prompt.lines();
    lines.find(|line| line.trim() == "## Section")?;
    lines.next().map(|line| line.trim().to_string())
}

#[async_trait]
impl CompletionAdapter for MockCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        shape: &OutputShape,
    ) -> Result<Option<JsonValue>, CompletionError> {
        if system_prompt == REPORT_COMPILER_INSTRUCTIONS {
            self.compiler_calls.lock().unwrap().push(messages.to_vec());
            let body = messages.last().map(Message::content).unwrap_or_default();
            return Ok(Some(json!(format!("Smoothed report:\n{}", body))));
        }

        if let OutputShape::Json { .. } = shape {
            let call = {
                let mut calls = self.planner_calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            *self.planner_messages.lock().unwrap() = messages.to_vec();
            if call <= self.empty_plans {
                return Ok(None);
            }
            return Ok(Some(self.plan()));
        }

        let section = section_from_prompt(system_prompt).ok_or_else(|| {
            CompletionError::InvalidResponse("unrecognized prompt".to_string())
        })?;

        let started = Instant::now();
        if let Some(delay) = self.delays.get(&section) {
            tokio::time::sleep(*delay).await;
        }
        let finished = Instant::now();

        self.writer_calls.lock().unwrap().push(WriterCall {
            section: section.clone(),
            started,
            finished,
            messages: messages.to_vec(),
        });

        if self.silent_sections.contains(&section) {
            return Ok(None);
        }
        Ok(Some(json!(format!("Body of {}", section))))
    }
}
