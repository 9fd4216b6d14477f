//! Configuration for report workflow execution.

use crate::retry::MAX_LLM_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable that switches section authoring to one-at-a-time mode.
pub const THROTTLE_ENV_VAR: &str = "THROTTLE_LLM_CALLS";

/// Number of canned query variants per research step.
pub const QUERIES_PER_SECTION: usize = 5;

/// How the final report text is produced from the written sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Concatenate the sections, then ask the model to smooth them into one report.
    #[default]
    LlmSmoothing,
    /// Concatenate the sections only. Output is byte-for-byte reproducible.
    Concatenate,
}

/// Which section message deltas are folded back into the shared log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Every section's new messages, in plan order.
    #[default]
    AllSections,
    /// Only the last section's new messages. Compatibility mode for runs that
    /// must match the older single-section merge.
    LastSectionOnly,
}

/// Configuration for a report workflow.
///
/// # Examples
///
/// ```ignore
/// use docgen::workflow::{CompileMode, WorkflowConfig};
///
/// let config = WorkflowConfig::new()
///     .with_throttled_sections(true)
///     .with_compile_mode(CompileMode::Concatenate);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Write sections strictly one after another instead of all at once.
    ///
    /// **Default:** `false` (parallel)
    #[serde(default)]
    pub throttle_section_authoring: bool,

    /// Attempts per model call before the call is considered exhausted.
    ///
    /// **Default:** 3
    pub max_llm_attempts: u32,

    /// Number of canned queries run per research step (capped at the number
    /// of variants available).
    ///
    /// **Default:** 5
    pub queries_per_section: usize,

    /// **Default:** [`CompileMode::LlmSmoothing`]
    #[serde(default)]
    pub compile_mode: CompileMode,

    /// **Default:** [`MergePolicy::AllSections`]
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self {
            throttle_section_authoring: false,
            max_llm_attempts: MAX_LLM_ATTEMPTS,
            queries_per_section: QUERIES_PER_SECTION,
            compile_mode: CompileMode::default(),
            merge_policy: MergePolicy::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `THROTTLE_LLM_CALLS` (optional, `"1"` enables throttled section authoring)
    pub fn from_env() -> Self {
        let throttle = env::var(THROTTLE_ENV_VAR).ok();
        Self::new().with_throttled_sections(parse_throttle_flag(throttle.as_deref()))
    }

    pub fn with_throttled_sections(mut self, throttle: bool) -> Self {
        self.throttle_section_authoring = throttle;
        self
    }

    pub fn with_max_llm_attempts(mut self, attempts: u32) -> Self {
        self.max_llm_attempts = attempts;
        self
    }

    pub fn with_queries_per_section(mut self, count: usize) -> Self {
        self.queries_per_section = count;
        self
    }

    pub fn with_compile_mode(mut self, mode: CompileMode) -> Self {
        self.compile_mode = mode;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }
}

/// Only the literal `"1"` enables throttling.
fn parse_throttle_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert!(!config.throttle_section_authoring);
        assert_eq!(config.max_llm_attempts, 3);
        assert_eq!(config.queries_per_section, 5);
        assert_eq!(config.compile_mode, CompileMode::LlmSmoothing);
        assert_eq!(config.merge_policy, MergePolicy::AllSections);
    }

    #[test]
    fn test_builder_chain() {
        let config = WorkflowConfig::new()
            .with_throttled_sections(true)
            .with_max_llm_attempts(5)
            .with_queries_per_section(2)
            .with_compile_mode(CompileMode::Concatenate)
            .with_merge_policy(MergePolicy::LastSectionOnly);

        assert!(config.throttle_section_authoring);
        assert_eq!(config.max_llm_attempts, 5);
        assert_eq!(config.queries_per_section, 2);
        assert_eq!(config.compile_mode, CompileMode::Concatenate);
        assert_eq!(config.merge_policy, MergePolicy::LastSectionOnly);
    }

    #[test]
    fn test_throttle_flag_parsing() {
        assert!(parse_throttle_flag(Some("1")));
        assert!(parse_throttle_flag(Some(" 1 ")));
        assert!(!parse_throttle_flag(Some("0")));
        assert!(!parse_throttle_flag(Some("true")));
        assert!(!parse_throttle_flag(None));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{"max_llm_attempts": 2, "queries_per_section": 3}"#).unwrap();

        assert!(!config.throttle_section_authoring);
        assert_eq!(config.max_llm_attempts, 2);
        assert_eq!(config.compile_mode, CompileMode::LlmSmoothing);
    }
}
