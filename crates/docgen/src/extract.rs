//! JSON extraction from raw model replies.
//!
//! Models asked for JSON frequently wrap it in a Markdown fence or surround it
//! with prose. These helpers recover the JSON text so the structured-output
//! step can parse and validate it.

use regex::Regex;
use tracing::debug;

/// Response parsing errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("No markdown code block found{0}")]
    BlockNotFound(String),

    #[error("No JSON entity found in response")]
    JsonNotFound,

    #[error("Invalid format in response: {0}")]
    InvalidFormat(String),
}

/// Extracts a JSON string from a raw LLM response string.
///
/// Tries, in order: a ```json fenced block, any fenced block that itself
/// contains JSON, and finally the first balanced `{...}` or `[...]` in the text.
pub fn extract_json(text: &str) -> Result<String, ParseError> {
    if let Ok(content) = extract_markdown_block_with_lang(text, "json") {
        return Ok(content);
    }

    if let Ok(content) = extract_markdown_block(text)
        && let Some(json) = first_json_entity(&content)
    {
        return Ok(json);
    }

    first_json_entity(text).ok_or(ParseError::JsonNotFound)
}

/// Extracts content from the first Markdown code block in the text.
pub fn extract_markdown_block(text: &str) -> Result<String, ParseError> {
    extract_block(text, None)
}

/// Extracts content from a Markdown code block tagged with `lang`.
pub fn extract_markdown_block_with_lang(text: &str, lang: &str) -> Result<String, ParseError> {
    extract_block(text, Some(lang))
}

fn extract_block(text: &str, lang: Option<&str>) -> Result<String, ParseError> {
    let pattern = match lang {
        Some(lang) => format!(
            r"(?m)^\s*```\s*{}\s*\n((?:.*\n)*?)^\s*```\s*$",
            regex::escape(lang)
        ),
        None => r"(?m)^\s*```[^\n]*\n((?:.*\n)*?)^\s*```\s*$".to_string(),
    };

    let regex = Regex::new(&pattern)
        .map_err(|e| ParseError::InvalidFormat(format!("Failed to compile regex: {}", e)))?;

    if let Some(content) = regex.captures(text).and_then(|captures| captures.get(1)) {
        return Ok(content.as_str().trim_end().to_string());
    }

    Err(ParseError::BlockNotFound(
        lang.map(|lang| format!(" with language '{}'", lang))
            .unwrap_or_default(),
    ))
}

/// Returns the first complete JSON entity (object or array) in `text`.
fn first_json_entity(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start_pos = None;
    let mut opening_char = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if start_pos.is_some() => in_string = !in_string,
            '{' | '[' if !in_string => {
                if depth == 0 {
                    start_pos = Some(i);
                    opening_char = Some(ch);
                }
                depth += 1;
            }
            '}' | ']' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let (Some(start), Some(opening)) = (start_pos, opening_char) else {
                        continue;
                    };
                    if (opening == '{' && ch == '}') || (opening == '[' && ch == ']') {
                        return Some(text[start..=i].to_string());
                    }
                    debug!("Mismatched JSON brackets; continuing scan");
                    start_pos = None;
                    opening_char = None;
                }
            }
            _ => {}
        }
    }

    None
}
