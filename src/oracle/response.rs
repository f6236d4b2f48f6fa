use serde::Deserialize;

use crate::core::schema::FieldMap;
use crate::error::FailureKind;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first choice's content out of a chat-completions body and
/// parses it as the field object.
pub fn parse_completion(body: &str) -> Result<FieldMap, FailureKind> {
    let completion: ChatCompletion = serde_json::from_str(body)
        .map_err(|err| FailureKind::malformed(format!("completion body is not JSON: {err}")))?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| FailureKind::malformed("completion has no message content"))?;
    parse_fields(&content)
}

pub fn parse_fields(content: &str) -> Result<FieldMap, FailureKind> {
    let cleaned = strip_code_fences(content);
    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|err| FailureKind::malformed(format!("content is not JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| FailureKind::malformed("content is not a JSON object"))?;
    Ok(FieldMap::from_json_object(object))
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
