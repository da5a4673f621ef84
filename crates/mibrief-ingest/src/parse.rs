//! Best-effort extraction of a card object from LLM text.

use serde_json::Value;

use mibrief_core::RawCard;

use crate::IngestError;

/// Strip a surrounding Markdown code fence, if any.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) up to the first newline. A fence on a
    // single line is left for the object-span fallback.
    let Some((_, body)) = rest.split_once('\n') else {
        return trimmed;
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Slice from the first `{` to the last `}`.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse LLM output into a card candidate. Tolerates code fences, prose
/// around the object, and a one-element array wrapper.
///
/// # Errors
///
/// Returns [`IngestError::MalformedOutput`] if no JSON object can be found.
pub fn parse_card_json(text: &str) -> Result<RawCard, IngestError> {
    let body = strip_fence(text);

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            let span = object_span(body)
                .ok_or_else(|| IngestError::MalformedOutput("no JSON object found".to_string()))?;
            serde_json::from_str(span).map_err(|e| IngestError::MalformedOutput(e.to_string()))?
        }
    };

    let object = match value {
        Value::Object(_) => value,
        Value::Array(mut items) if !items.is_empty() && items[0].is_object() => items.swap_remove(0),
        other => {
            return Err(IngestError::MalformedOutput(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    serde_json::from_value(object).map_err(|e| IngestError::MalformedOutput(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let raw = parse_card_json(r#"{"title": "Hello there", "sourceTier": 2}"#).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Hello there"));
        assert_eq!(raw.source_tier_value(), Some(2));
    }

    #[test]
    fn parses_fenced_object() {
        let text = "```json\n{\"title\": \"Fenced\"}\n```";
        assert_eq!(parse_card_json(text).unwrap().title.as_deref(), Some("Fenced"));
    }

    #[test]
    fn parses_single_line_fence() {
        let text = "```json {\"title\": \"One line\"}```";
        assert_eq!(parse_card_json(text).unwrap().title.as_deref(), Some("One line"));
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let text = "Here is the card you asked for:\n{\"title\": \"Wrapped\", \"signals\": [\"a {b}\"]}\nLet me know!";
        let raw = parse_card_json(text).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Wrapped"));
        assert_eq!(raw.signal_items().map(Vec::len), Some(1));
    }

    #[test]
    fn unwraps_single_element_array() {
        let raw = parse_card_json(r#"[{"title": "In array"}]"#).unwrap();
        assert_eq!(raw.title.as_deref(), Some("In array"));
    }

    #[test]
    fn rejects_text_without_object() {
        let err = parse_card_json("I could not find any news today.").unwrap_err();
        assert!(matches!(err, IngestError::MalformedOutput(_)));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = parse_card_json("42").unwrap_err();
        assert!(err.to_string().contains("a number"), "{err}");
    }

    #[test]
    fn rejects_wrong_field_types() {
        let err = parse_card_json(r#"{"title": 7}"#).unwrap_err();
        assert!(matches!(err, IngestError::MalformedOutput(_)));
    }
}
