use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical chat message handed to an agent's generate capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

const DEFAULT_ROLE: &str = "user";

/// Sentinel produced when a parts-style message carries no extractable
/// text. Dropped by the post-pass, so it never reaches an agent.
const EMPTY_CONTENT_PLACEHOLDER: &str = "[no text content]";

/// Shape matchers tried in order; first match wins. Inbound A2A traffic
/// has gone through several historical message formats, so each format
/// gets its own matcher rather than one branchy parser. New shapes get
/// appended here without touching the gateway.
const MATCHERS: &[fn(&Value) -> Option<ChatMessage>] =
    &[match_parts_message, match_role_content, match_loose];

/// Normalize a raw inbound message list to canonical role/content pairs.
///
/// Messages that normalize to empty content are dropped. An input that
/// yields nothing at all falls back to a single synthetic greeting so
/// the downstream agent always receives one well-formed message.
pub fn normalize(raw: &[Value]) -> Vec<ChatMessage> {
    let mut out: Vec<ChatMessage> = raw
        .iter()
        .filter_map(|value| MATCHERS.iter().find_map(|matcher| matcher(value)))
        .filter(|m| !m.content.is_empty() && m.content != EMPTY_CONTENT_PLACEHOLDER)
        .collect();

    if out.is_empty() {
        out.push(ChatMessage::user("Hello"));
    }
    out
}

/// A2A-style message: `{role, parts: [{kind|type, text|content}]}`.
/// Text parts are concatenated with newlines; a parts message with no
/// extractable text yields the placeholder (and is later dropped).
fn match_parts_message(value: &Value) -> Option<ChatMessage> {
    let parts = value.get("parts")?.as_array()?;

    let fragments: Vec<&str> = parts.iter().filter_map(part_text).collect();
    let content = fragments.join("\n").trim().to_string();

    Some(ChatMessage {
        role: role_of(value),
        content: if content.is_empty() {
            EMPTY_CONTENT_PLACEHOLDER.to_string()
        } else {
            content
        },
    })
}

fn part_text(part: &Value) -> Option<&str> {
    let tag = part
        .get("kind")
        .or_else(|| part.get("type"))
        .and_then(Value::as_str);

    // Historical tag spellings for a text part.
    let tagged_text = matches!(tag, Some("text") | Some("text/plain"));
    let text = part
        .get("text")
        .or_else(|| part.get("content"))
        .and_then(Value::as_str);

    match (tagged_text, text) {
        (true, Some(t)) => Some(t),
        // Untagged part that still carries a string `text` field.
        (false, _) => part.get("text").and_then(Value::as_str),
        (true, None) => None,
    }
}

/// Plain `{role, content}` pair — the canonical shape passes through.
fn match_role_content(value: &Value) -> Option<ChatMessage> {
    let role = value.get("role")?.as_str()?;
    let content = value.get("content")?;
    Some(ChatMessage::new(role, coerce_text(content).trim()))
}

/// Last resort: scan well-known text fields in priority order, or take
/// the element itself as a string.
fn match_loose(value: &Value) -> Option<ChatMessage> {
    let content = value
        .get("content")
        .or_else(|| value.get("text"))
        .or_else(|| value.get("message"))
        .map(coerce_text)
        .or_else(|| value.as_str().map(str::to_string))?;

    Some(ChatMessage {
        role: role_of(value),
        content: content.trim().to_string(),
    })
}

fn role_of(value: &Value) -> String {
    value
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ROLE)
        .to_string()
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_messages_round_trip_unchanged() {
        let raw = vec![json!({"role": "user", "content": "X"})];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("X")]);
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let raw = vec![
            json!({"role": "user", "content": "  first  "}),
            json!({"role": "assistant", "content": "second"}),
        ];
        let once = normalize(&raw);
        let raw_again: Vec<Value> = once
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        assert_eq!(normalize(&raw_again), once);
    }

    #[test]
    fn empty_input_falls_back_to_synthetic_greeting() {
        assert_eq!(normalize(&[]), vec![ChatMessage::user("Hello")]);
    }

    #[test]
    fn parts_messages_concatenate_text_parts() {
        let raw = vec![json!({
            "role": "user",
            "parts": [
                {"kind": "text", "text": "line one"},
                {"kind": "image", "url": "ignored"},
                {"type": "text/plain", "text": "line two"},
            ]
        })];
        assert_eq!(
            normalize(&raw),
            vec![ChatMessage::user("line one\nline two")]
        );
    }

    #[test]
    fn untagged_parts_with_text_field_still_extract() {
        let raw = vec![json!({"parts": [{"text": "hi there"}]})];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("hi there")]);
    }

    #[test]
    fn parts_message_without_text_is_dropped() {
        let raw = vec![
            json!({"role": "user", "parts": [{"kind": "image", "url": "x"}]}),
            json!({"role": "user", "content": "kept"}),
        ];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("kept")]);
    }

    #[test]
    fn loose_shapes_scan_known_fields_in_priority_order() {
        let raw = vec![
            json!({"text": "from text"}),
            json!({"message": "from message"}),
            json!({"content": "wins", "text": "loses"}),
            json!("bare string"),
        ];
        let normalized = normalize(&raw);
        assert_eq!(
            normalized,
            vec![
                ChatMessage::user("from text"),
                ChatMessage::user("from message"),
                ChatMessage::user("wins"),
                ChatMessage::user("bare string"),
            ]
        );
    }

    #[test]
    fn whitespace_only_content_is_dropped() {
        let raw = vec![
            json!({"role": "user", "content": "   "}),
            json!({"role": "user", "content": "real"}),
        ];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("real")]);
    }

    #[test]
    fn all_empty_messages_still_yield_the_greeting() {
        let raw = vec![json!({"role": "user", "content": ""}), json!({})];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("Hello")]);
    }

    #[test]
    fn non_string_content_is_coerced() {
        let raw = vec![json!({"role": "user", "content": 42})];
        assert_eq!(normalize(&raw), vec![ChatMessage::user("42")]);
    }
}
