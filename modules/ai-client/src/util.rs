use serde_json::{Map, Value};

use crate::error::{AiError, Result};

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip a surrounding markdown code fence (```json or ```) from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse model output as a single JSON object.
///
/// Arrays, scalars and anything that is not well-formed JSON are rejected.
pub fn parse_json_object(response: &str) -> Result<Map<String, Value>> {
    let body = strip_code_blocks(response);
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(AiError::Parse(format!(
            "expected a JSON object, got {}",
            truncate_to_char_boundary(&other.to_string(), 80)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundary() {
        let text = "TTC 0.4s → collision";
        let truncated = truncate_to_char_boundary(text, 10);
        assert!(truncated.len() <= 10);
        assert!(text.starts_with(truncated));
        assert_eq!(truncate_to_char_boundary("short", 100), "short");
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_blocks("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  {}  "), "{}");
    }

    #[test]
    fn parses_fenced_object() {
        let map = parse_json_object("```json\n{\"ego_speed\": 95.5}\n```").unwrap();
        assert_eq!(map.get("ego_speed").and_then(Value::as_f64), Some(95.5));
    }

    #[test]
    fn rejects_non_objects_and_garbage() {
        assert!(matches!(parse_json_object("[1, 2]"), Err(AiError::Parse(_))));
        assert!(matches!(parse_json_object("sure! here you go"), Err(AiError::Parse(_))));
        assert!(matches!(parse_json_object("{\"ego_speed\": "), Err(AiError::Parse(_))));
    }
}
