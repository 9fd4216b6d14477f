//! Seams to the two external collaborators of the workflow.
//!
//! The workflow never talks to a search engine or a model provider directly.
//! It talks to a [`SearchAdapter`] (`search(query) -> text`) and a
//! [`CompletionAdapter`] (`complete(system_prompt, messages, shape) -> value | nothing`).
//! Concrete HTTP implementations live behind feature flags; tests plug in
//! scripted implementations.
//!
//! # Output shapes
//!
//! Every completion names the shape it expects back. [`OutputShape::Text`]
//! asks for prose; [`OutputShape::Json`] carries a JSON schema generated by
//! `schemars` from the Rust type the caller will deserialize into:
//!
//! ```rust,ignore
//! use docgen::adapter::OutputShape;
//! use docgen::workflow::ReportPlan;
//!
//! let shape = OutputShape::json::<ReportPlan>();
//! ```

pub mod error;

#[cfg(feature = "openai-api")]
pub mod openai;

#[cfg(feature = "tavily-search")]
pub mod tavily;

pub use error::{CompletionError, SearchError};

#[cfg(feature = "openai-api")]
pub use openai::OpenAiCompletion;

#[cfg(feature = "tavily-search")]
pub use tavily::TavilySearch;

use crate::message::Message;
use async_trait::async_trait;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde_json::Value as JsonValue;

/// The shape a completion is expected to conform to.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// Free-form prose, returned as a JSON string.
    Text,
    /// A JSON value matching `schema`.
    Json { name: String, schema: JsonValue },
}

impl OutputShape {
    /// Builds a JSON shape from the schema of `T`.
    pub fn json<T: JsonSchema>() -> Self {
        let root = SchemaSettings::draft07()
            .with(|settings| settings.inline_subschemas = true)
            .into_generator()
            .into_root_schema_for::<T>();
        let schema = serde_json::to_value(root).unwrap_or_default();
        Self::Json {
            name: T::schema_name(),
            schema,
        }
    }

    /// Returns a short label for logging.
    pub fn label(&self) -> &str {
        match self {
            OutputShape::Text => "text",
            OutputShape::Json { name, .. } => name,
        }
    }
}

/// Executes one textual web search and returns its results as plain text.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

/// Runs one structured LLM completion.
///
/// Returns `Ok(None)` when the model produced no usable value ("no result").
/// That is a normal outcome the caller may retry; `Err` is reserved for
/// transport and protocol failures.
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        shape: &OutputShape,
    ) -> Result<Option<JsonValue>, CompletionError>;

    /// Returns the name of this adapter, used in log output.
    fn name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("UnknownAdapter")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Outline {
        title: String,
        chapters: Vec<String>,
    }

    #[test]
    fn test_json_shape_carries_schema_properties() {
        let shape = OutputShape::json::<Outline>();
        match shape {
            OutputShape::Json { name, schema } => {
                assert_eq!(name, "Outline");
                assert!(schema["properties"].get("title").is_some());
                assert!(schema["properties"].get("chapters").is_some());
            }
            OutputShape::Text => panic!("expected a JSON shape"),
        }
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Chapter {
        heading: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct NestedOutline {
        title: String,
        chapters: Vec<Chapter>,
    }

    #[test]
    fn test_json_shape_inlines_nested_types() {
        let OutputShape::Json { schema, .. } = OutputShape::json::<NestedOutline>() else {
            panic!("expected a JSON shape");
        };
        assert!(schema.get("definitions").is_none());
        let items = &schema["properties"]["chapters"]["items"];
        assert!(items.get("$ref").is_none());
        assert!(items["properties"].get("heading").is_some());
    }

    #[test]
    fn test_label() {
        assert_eq!(OutputShape::Text.label(), "text");
        assert_eq!(OutputShape::json::<Outline>().label(), "Outline");
    }
}
