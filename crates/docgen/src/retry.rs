//! Bounded retry around unreliable model calls.
//!
//! Every LLM-calling stage goes through [`retrying_call`]. A call is retried
//! when the model returns nothing, returns something that does not fit the
//! requested shape, or fails with a retryable transport error. When the
//! attempt budget runs out the caller gets [`RetryError::Exhausted`], a
//! distinct terminal value rather than a generic failure.
//!
//! No delay is applied between attempts.

use crate::adapter::{CompletionAdapter, CompletionError, OutputShape};
use crate::extract::extract_json;
use crate::message::Message;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default number of attempts for every model call in the workflow.
pub const MAX_LLM_ATTEMPTS: u32 = 3;

/// Why a single attempt did not produce a usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The adapter returned no result, or an empty one.
    Empty,
    /// The result did not parse into, or validate as, the requested shape.
    SchemaMismatch(String),
    /// A retryable transport failure.
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Empty => f.write_str("empty result"),
            AttemptFailure::SchemaMismatch(reason) => write!(f, "schema mismatch: {}", reason),
            AttemptFailure::Transport(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}

/// Outcome of one attempt that did not succeed.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth another attempt.
    Retry(AttemptFailure),
    /// Stop immediately.
    Abort(CompletionError),
}

impl From<CompletionError> for AttemptError {
    fn from(err: CompletionError) -> Self {
        if err.is_retryable() {
            AttemptError::Retry(AttemptFailure::Transport(err.to_string()))
        } else {
            AttemptError::Abort(err)
        }
    }
}

/// Terminal failure of a retrying call.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt failed with a retryable condition.
    #[error("No usable model output after {attempts} attempt(s); last failure: {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },

    /// A non-retryable adapter failure ended the call early.
    #[error("Model call aborted: {0}")]
    Aborted(#[source] CompletionError),
}

impl RetryError {
    /// Returns `true` if the attempt budget was used up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// A value that can be requested from the model and checked on arrival.
///
/// `String` is the plain-text output. Structured types implement this with
/// [`parse_json_output`] and add their own invariants in `validate`.
pub trait StructuredOutput: Sized + Send {
    /// The shape sent to the adapter.
    fn output_shape() -> OutputShape;

    /// Converts a non-empty adapter value into `Self`.
    fn from_output(value: JsonValue) -> Result<Self, String>;
}

impl StructuredOutput for String {
    fn output_shape() -> OutputShape {
        OutputShape::Text
    }

    fn from_output(value: JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::String(text) => Ok(text),
            other => Err(format!("expected text, got {}", json_kind(&other))),
        }
    }
}

/// Deserializes a JSON output, accepting a string that wraps the JSON.
pub fn parse_json_output<T: DeserializeOwned>(value: JsonValue) -> Result<T, String> {
    let value = match value {
        JsonValue::String(raw) => {
            let json = extract_json(&raw).map_err(|e| e.to_string())?;
            serde_json::from_str::<JsonValue>(&json).map_err(|e| e.to_string())?
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Executes an operation with bounded retry.
///
/// `operation` receives the 1-based attempt number. It is invoked at most
/// `max_attempts` times (at least once). Retryable failures are logged and
/// retried; an [`AttemptError::Abort`] ends the loop immediately.
pub async fn retry_execution<F, Fut, T>(
    max_attempts: u32,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(output) => {
                if attempt > 1 {
                    info!(attempt, max_attempts, "Model call succeeded after retry");
                }
                return Ok(output);
            }
            Err(AttemptError::Retry(failure)) if attempt < max_attempts => {
                debug!(
                    attempt,
                    max_attempts,
                    failure = %failure,
                    "Retrying LLM call"
                );
            }
            Err(AttemptError::Retry(failure)) => {
                error!(
                    attempts = attempt,
                    failure = %failure,
                    "Model call failed, attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }
            Err(AttemptError::Abort(err)) => {
                warn!(attempt, error = %err, "Model call failed with non-retryable error");
                return Err(RetryError::Aborted(err));
            }
        }
    }
}

/// Calls the completion adapter until it yields a usable `T`.
pub async fn retrying_call<T: StructuredOutput>(
    adapter: &dyn CompletionAdapter,
    system_prompt: &str,
    messages: &[Message],
    max_attempts: u32,
) -> Result<T, RetryError> {
    let shape = T::output_shape();
    let shape = &shape;

    retry_execution(max_attempts, move |attempt| {
        async move {
            debug!(
                adapter = %adapter.name(),
                shape = shape.label(),
                attempt,
                "Calling model"
            );
            let value = adapter
                .complete(system_prompt, messages, shape)
                .await?
                .filter(|value| !is_empty_output(value))
                .ok_or(AttemptError::Retry(AttemptFailure::Empty))?;

            T::from_output(value)
                .map_err(|reason| AttemptError::Retry(AttemptFailure::SchemaMismatch(reason)))
        }
    })
    .await
}

fn is_empty_output(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(text) => text.trim().is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Adapter that replays a fixed script of replies, then repeats the last one.
    struct ScriptedAdapter {
        replies: Mutex<Vec<Result<Option<JsonValue>, CompletionError>>>,
        calls: AtomicU32,
    }

    impl ScriptedAdapter {
        fn new(replies: Vec<Result<Option<JsonValue>, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionAdapter for ScriptedAdapter {
        async fn complete(
            &self,
            _system_prompt: &str,
            _messages: &[Message],
            _shape: &OutputShape,
        ) -> Result<Option<JsonValue>, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                match &replies[0] {
                    Ok(value) => Ok(value.clone()),
                    Err(err) => Err(CompletionError::transport(
                        err.to_string(),
                        err.is_retryable(),
                    )),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let adapter = ScriptedAdapter::new(vec![Ok(Some(json!("hello")))]);

        let result: String = retrying_call(&adapter, "sys", &[], 3).await.unwrap();

        assert_eq!(result, "hello");
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_after_empty_results() {
        let adapter = ScriptedAdapter::new(vec![
            Ok(None),
            Ok(Some(json!("   "))),
            Ok(Some(json!("third time"))),
        ]);

        let result: String = retrying_call(&adapter, "sys", &[], 3).await.unwrap();

        assert_eq!(result, "third time");
        assert_eq!(adapter.calls(), 3, "Should stop at the first usable value");
    }

    #[tokio::test]
    async fn test_always_empty_exhausts_after_max_attempts() {
        let adapter = ScriptedAdapter::new(vec![Ok(None)]);

        let err = retrying_call::<String>(&adapter, "sys", &[], 3)
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert!(matches!(
            err,
            RetryError::Exhausted {
                attempts: 3,
                last: AttemptFailure::Empty
            }
        ));
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_retried() {
        let adapter = ScriptedAdapter::new(vec![Ok(Some(json!(42))), Ok(Some(json!("fine")))]);

        let result: String = retrying_call(&adapter, "sys", &[], 3).await.unwrap();

        assert_eq!(result, "fine");
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_retryable_transport_error_consumes_attempt() {
        let adapter = ScriptedAdapter::new(vec![
            Err(CompletionError::transport("connection reset", true)),
            Ok(Some(json!("recovered"))),
        ]);

        let result: String = retrying_call(&adapter, "sys", &[], 3).await.unwrap();

        assert_eq!(result, "recovered");
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejected_request_aborts_immediately() {
        let adapter = ScriptedAdapter::new(vec![
            Err(CompletionError::Rejected("invalid api key".to_string())),
            Ok(Some(json!("never reached"))),
        ]);

        let err = retrying_call::<String>(&adapter, "sys", &[], 3)
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Aborted(CompletionError::Rejected(_))));
        assert_eq!(adapter.calls(), 1, "Should not retry non-retryable errors");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);

        let result = retry_execution(0, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AttemptError::Retry(AttemptFailure::Empty)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_json_output_accepts_wrapped_string() {
        #[derive(serde::Deserialize)]
        struct Pair {
            a: u32,
        }

        let pair: Pair = parse_json_output(json!("```json\n{\"a\": 7}\n```")).unwrap();
        assert_eq!(pair.a, 7);

        let pair: Pair = parse_json_output(json!({"a": 8})).unwrap();
        assert_eq!(pair.a, 8);

        assert!(parse_json_output::<Pair>(json!({"b": 1})).is_err());
    }
}
