//! State threaded through the report workflow.
//!
//! [`AgentState`] is owned by the top-level workflow. Stages read it and hand
//! back a [`StateUpdate`]; only [`AgentState::apply`] mutates it, and it
//! refuses updates that arrive out of order or that would reshape the plan.

use crate::adapter::OutputShape;
use crate::message::Message;
use crate::retry::{StructuredOutput, parse_json_output};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use super::error::{StageId, WorkflowError};

/// One named section of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Heading of the section.
    pub name: String,
    /// Body text. Empty in a fresh plan; written once by the section's writer.
    #[serde(default)]
    pub content: String,
}

impl Section {
    /// Creates a section with no content.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
        }
    }

    /// Creates a section that already carries its content.
    pub fn with_content(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Returns `true` once the section has been written.
    pub fn is_written(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// The outline of the report: a title and an ordered list of sections.
///
/// Section count and order are fixed once the plan exists. Positions in
/// `sections` are the indices used to match section writers back to their slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportPlan {
    /// Title of the report.
    pub title: String,
    /// Sections in reading order.
    pub sections: Vec<Section>,
}

impl ReportPlan {
    /// Creates a plan with empty sections named `names`.
    pub fn new<I, S>(title: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            sections: names.into_iter().map(Section::new).collect(),
        }
    }

    /// Checks the structural invariants of a plan.
    ///
    /// A plan needs a title, at least one section, and non-empty section
    /// names. Names may repeat: sections are matched back by position.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("report plan has an empty title".to_string());
        }
        if self.sections.is_empty() {
            return Err("report plan has no sections".to_string());
        }

        if let Some(index) = self
            .sections
            .iter()
            .position(|section| section.name.trim().is_empty())
        {
            return Err(format!("section {} has an empty name", index));
        }
        Ok(())
    }

    /// Names of the sections that still have no content.
    pub fn unwritten_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|section| !section.is_written())
            .map(|section| section.name.as_str())
            .collect()
    }

    /// Returns `true` if every section has content.
    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(Section::is_written)
    }
}

impl StructuredOutput for ReportPlan {
    fn output_shape() -> OutputShape {
        OutputShape::json::<ReportPlan>()
    }

    /// Parses and validates a plan. Any content the model put in the sections
    /// is discarded: section bodies belong to the section writers.
    fn from_output(value: JsonValue) -> Result<Self, String> {
        let mut plan: ReportPlan = parse_json_output(value)?;
        plan.validate()?;
        for section in &mut plan.sections {
            section.name = section.name.trim().to_string();
            section.content.clear();
        }
        Ok(plan)
    }
}

/// Position of the top-level workflow.
///
/// `Start -> Researched -> Planned -> SectionsWritten -> Compiled`, with no
/// branches and no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    Start,
    Researched,
    Planned,
    SectionsWritten,
    Compiled,
}

impl WorkflowStage {
    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            WorkflowStage::Start => Some(WorkflowStage::Researched),
            WorkflowStage::Researched => Some(WorkflowStage::Planned),
            WorkflowStage::Planned => Some(WorkflowStage::SectionsWritten),
            WorkflowStage::SectionsWritten => Some(WorkflowStage::Compiled),
            WorkflowStage::Compiled => None,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStage::Start => "start",
            WorkflowStage::Researched => "researched",
            WorkflowStage::Planned => "planned",
            WorkflowStage::SectionsWritten => "sections_written",
            WorkflowStage::Compiled => "compiled",
        };
        f.write_str(label)
    }
}

/// The fields a stage hands back to the workflow.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// Topic research finished; `messages` are appended to the log.
    Researched { messages: Vec<Message> },
    /// The outline is ready.
    Planned { plan: ReportPlan },
    /// Every section is written. `sections` are in plan order.
    SectionsWritten {
        sections: Vec<Section>,
        messages: Vec<Message>,
    },
    /// The final report text.
    Compiled { report: String },
}

impl StateUpdate {
    /// The stage reached once this update is applied.
    pub fn target_stage(&self) -> WorkflowStage {
        match self {
            StateUpdate::Researched { .. } => WorkflowStage::Researched,
            StateUpdate::Planned { .. } => WorkflowStage::Planned,
            StateUpdate::SectionsWritten { .. } => WorkflowStage::SectionsWritten,
            StateUpdate::Compiled { .. } => WorkflowStage::Compiled,
        }
    }
}

/// State of one report generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub topic: String,
    pub report_structure: String,
    pub plan: Option<ReportPlan>,
    pub report: Option<String>,
    pub messages: Vec<Message>,
    pub stage: WorkflowStage,
}

impl AgentState {
    /// Creates the initial state from caller input.
    pub fn new(topic: impl Into<String>, report_structure: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            report_structure: report_structure.into(),
            plan: None,
            report: None,
            messages: Vec::new(),
            stage: WorkflowStage::Start,
        }
    }

    /// Merges a stage result into the state and advances the stage.
    ///
    /// Fails if the update does not belong to the next stage, or if written
    /// sections do not line up one-to-one with the plan.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), WorkflowError> {
        let target = update.target_stage();
        if self.stage.next() != Some(target) {
            return Err(WorkflowError::precondition(
                StageId::from(target),
                format!("cannot move from '{}' to '{}'", self.stage, target),
            ));
        }

        match update {
            StateUpdate::Researched { messages } => {
                self.messages.extend(messages);
            }
            StateUpdate::Planned { plan } => {
                self.plan = Some(plan);
            }
            StateUpdate::SectionsWritten { sections, messages } => {
                let plan = self.plan.as_mut().ok_or_else(|| {
                    WorkflowError::precondition(StageId::SectionAuthoring, "report plan is not set")
                })?;
                if sections.len() != plan.sections.len()
                    || sections
                        .iter()
                        .zip(&plan.sections)
                        .any(|(written, planned)| written.name != planned.name)
                {
                    return Err(WorkflowError::precondition(
                        StageId::SectionAuthoring,
                        "written sections do not match the report plan",
                    ));
                }
                plan.sections = sections;
                self.messages.extend(messages);
            }
            StateUpdate::Compiled { report } => {
                self.report = Some(report);
            }
        }

        self.stage = target;
        Ok(())
    }
}

/// The narrowed, owned view handed to one section's sub-workflow.
///
/// Built by copying at fan-out time, so concurrent writers never share a
/// section or a message list.
#[derive(Debug, Clone)]
pub struct SectionWriterState {
    pub index: usize,
    pub section: Section,
    pub topic: String,
    pub messages: Vec<Message>,
}

impl SectionWriterState {
    pub fn new(
        index: usize,
        section: Section,
        topic: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            index,
            section,
            topic: topic.into(),
            messages,
        }
    }
}
