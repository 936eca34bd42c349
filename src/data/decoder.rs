//! Tolerant line decoder for Claude Code JSONL records.
//!
//! Each line is parsed into a generic `serde_json::Value` first so unknown
//! fields are never dropped, then known fields are extracted with
//! type-checked, best-effort casts: a field present with the wrong type is
//! treated as absent, not a fatal error. Only syntactically invalid lines
//! produce a decode failure.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use super::ParseError;
use crate::models::{ConversationEntry, MessagePayload, ParsedMessage, TokenUsage};


/// Which counter a usage probe populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenField {
    Input,
    Output,
    CacheCreation,
    CacheRead,
}


/// Decoder for one run. Holds the compiled heuristic patterns so they are
/// built once, not per line.
pub struct LineDecoder {
    model_patterns: Vec<Regex>,
    usage_probes: Vec<(TokenField, Regex)>,
}


impl LineDecoder {
    pub fn new() -> Self {
        // Ordered: first match wins.
        let model_patterns = [
            r"claude-3-5-sonnet-[0-9]+",
            r"claude-3-5-haiku-[0-9]+",
            r"claude-3-opus-[0-9]+",
            r"claude-3-sonnet-[0-9]+",
            r"claude-3-haiku-[0-9]+",
            r"claude-[0-9]+-[a-z]+-[0-9]+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static model pattern"))
        .collect();

        // Ordered: declared-field forms strictly before the loose "N tokens"
        // phrasings, and the first probe to populate a given counter wins.
        let usage_probes = [
            (TokenField::Input, r#""input_tokens"\s*:\s*(\d+)"#),
            (TokenField::Output, r#""output_tokens"\s*:\s*(\d+)"#),
            (
                TokenField::CacheCreation,
                r#""cache_creation_input_tokens"\s*:\s*(\d+)"#,
            ),
            (
                TokenField::CacheRead,
                r#""cache_read_input_tokens"\s*:\s*(\d+)"#,
            ),
            (TokenField::Input, r"input.*?(\d+).*?tokens"),
            (TokenField::Output, r"output.*?(\d+).*?tokens"),
            (TokenField::Input, r"(\d+).*?input.*?tokens"),
            (TokenField::Output, r"(\d+).*?output.*?tokens"),
        ]
        .iter()
        .map(|(field, p)| (*field, Regex::new(p).expect("static usage probe")))
        .collect();

        Self {
            model_patterns,
            usage_probes,
        }
    }

    /// Decode one line into a normalized entry.
    pub fn decode_line(&self, line: &str) -> Result<ConversationEntry, ParseError> {
        let value: Value =
            serde_json::from_str(line).map_err(|source| ParseError::Malformed { source })?;
        let Value::Object(raw) = value else {
            return Err(ParseError::NotAnObject);
        };

        let payload = raw.get("message").and_then(|v| self.payload_from_value(v));
        let message = payload.map(|p| self.parse_message(p));

        let mut entry = ConversationEntry {
            entry_type: str_field(&raw, "type").unwrap_or_default(),
            timestamp: str_field(&raw, "timestamp").and_then(|s| parse_timestamp(&s)),
            session_id: str_field(&raw, "sessionId").unwrap_or_default(),
            cwd: str_field(&raw, "cwd").unwrap_or_default(),
            cost_usd: raw.get("costUSD").and_then(Value::as_f64),
            message,
            extracted_usage: None,
            raw,
        };

        if let Some(message) = &entry.message {
            entry.extracted_usage = self.extract_usage(message);
        }

        Ok(entry)
    }

    /// Normalize either payload variant. The heuristic path only runs for
    /// raw text; structured fields always take precedence.
    fn parse_message(&self, payload: MessagePayload) -> ParsedMessage {
        match payload {
            MessagePayload::Raw(text) => ParsedMessage {
                role: None,
                model: self.extract_model_from_text(&text),
                usage: self.extract_usage_from_text(&text),
                content: Some(text),
            },
            MessagePayload::Structured {
                role,
                content,
                model,
                usage,
            } => ParsedMessage {
                role,
                content,
                model,
                usage,
            },
        }
    }

    /// Resolve the usage attributed to a decoded message, in priority order:
    /// explicit usage, string probes over the content, word-count estimate.
    fn extract_usage(&self, message: &ParsedMessage) -> Option<TokenUsage> {
        if let Some(usage) = &message.usage {
            if !usage.is_empty() {
                return Some(*usage);
            }
        }

        let content = message.content.as_deref()?;
        if let Some(usage) = self.extract_usage_from_text(content) {
            return Some(usage);
        }

        estimate_usage(content, message.role.as_deref())
    }

    /// Lift the raw `message` value into the payload sum type. Non-string,
    /// non-object shapes are dropped.
    fn payload_from_value(&self, value: &Value) -> Option<MessagePayload> {
        match value {
            Value::String(s) => Some(MessagePayload::Raw(s.clone())),
            Value::Object(obj) => {
                let mut usage = obj.get("usage").and_then(|v| self.usage_from_value(v));
                // The original logs occasionally stash token info under
                // loosely named string fields; probe them whenever the usage
                // field itself yields nothing.
                if usage.map_or(true, |u| u.is_empty()) {
                    if let Some(probed) = ["tokens", "token_count", "usage_info"]
                        .iter()
                        .filter_map(|key| str_field(obj, key))
                        .find_map(|text| self.extract_usage_from_text(&text))
                    {
                        usage = Some(probed);
                    }
                }
                Some(MessagePayload::Structured {
                    role: str_field(obj, "role"),
                    content: obj.get("content").and_then(content_text),
                    model: str_field(obj, "model"),
                    usage,
                })
            }
            _ => None,
        }
    }

    /// Extract a usage value: either a proper `{input_tokens, ...}` map or an
    /// inline string, which is run through the same probes as free text.
    fn usage_from_value(&self, value: &Value) -> Option<TokenUsage> {
        let obj = match value {
            Value::String(s) => return self.extract_usage_from_text(s),
            Value::Object(obj) => obj,
            _ => return None,
        };
        let field = |key: &str| obj.get(key).and_then(Value::as_u64).unwrap_or(0);

        let mut usage = TokenUsage {
            input_tokens: field("input_tokens"),
            output_tokens: field("output_tokens"),
            cache_creation_tokens: field("cache_creation_input_tokens"),
            cache_read_tokens: field("cache_read_input_tokens"),
            total_tokens: 0,
        };
        usage.total_tokens = usage.total();
        Some(usage)
    }

    fn extract_model_from_text(&self, text: &str) -> Option<String> {
        self.model_patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str().to_string())
    }

    /// Run the ordered probe list over free text. Returns `None` when no
    /// probe matched anything.
    fn extract_usage_from_text(&self, text: &str) -> Option<TokenUsage> {
        let mut usage = TokenUsage::default();

        for (field, re) in &self.usage_probes {
            let slot = match field {
                TokenField::Input => &mut usage.input_tokens,
                TokenField::Output => &mut usage.output_tokens,
                TokenField::CacheCreation => &mut usage.cache_creation_tokens,
                TokenField::CacheRead => &mut usage.cache_read_tokens,
            };
            if *slot != 0 {
                continue;
            }
            if let Some(caps) = re.captures(text) {
                if let Ok(n) = caps[1].parse::<u64>() {
                    *slot = n;
                }
            }
        }

        if usage.is_empty() {
            return None;
        }
        usage.total_tokens = usage.total();
        Some(usage)
    }
}


impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}


/// Flatten message content: a plain string passes through; an array of text
/// blocks is joined with newlines.
fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|b| {
                    let obj = b.as_object()?;
                    if obj.get("type").and_then(Value::as_str) == Some("text") {
                        obj.get("text").and_then(Value::as_str)
                    } else {
                        None
                    }
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        _ => None,
    }
}


/// Best-effort string extraction: wrong-typed fields are treated as absent.
fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}


/// Last-resort token estimate from text length: roughly 4 tokens per 3
/// words, attributed by role. Never overrides a discovered explicit usage.
fn estimate_usage(content: &str, role: Option<&str>) -> Option<TokenUsage> {
    let words = content.split_whitespace().count() as u64;
    let estimated = words * 4 / 3;
    if estimated == 0 {
        return None;
    }

    let mut usage = TokenUsage::default();
    match role {
        Some("user") => usage.input_tokens = estimated,
        Some("assistant") => usage.output_tokens = estimated,
        _ => {
            usage.input_tokens = estimated / 2;
            usage.output_tokens = estimated - usage.input_tokens;
        }
    }
    usage.total_tokens = usage.total();
    Some(usage)
}


/// Parse a timestamp against a fixed ordered list of formats; the first that
/// parses wins. Bare date-times without an offset are assumed UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.3fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> LineDecoder {
        LineDecoder::new()
    }

    #[test]
    fn test_decode_structured_entry() {
        let line = r#"{
            "type": "assistant",
            "timestamp": "2024-01-15T10:30:00Z",
            "sessionId": "sess-1",
            "cwd": "/home/user/project",
            "message": {
                "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": "done",
                "usage": {
                    "input_tokens": 100,
                    "output_tokens": 50,
                    "cache_read_input_tokens": 25
                }
            }
        }"#
        .replace('\n', " ");

        let entry = decoder().decode_line(&line).unwrap();
        assert_eq!(entry.entry_type, "assistant");
        assert_eq!(entry.session_id, "sess-1");
        assert!(entry.timestamp.is_some());

        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 50);
        assert_eq!(usage.cache_read_tokens, 25);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(decoder().decode_line("not json at all").is_err());
        assert!(decoder().decode_line("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_wrong_typed_fields_are_absent_not_fatal() {
        let line = r#"{"type": 42, "sessionId": {"nested": true}, "timestamp": false}"#;
        let entry = decoder().decode_line(line).unwrap();
        assert_eq!(entry.entry_type, "");
        assert_eq!(entry.session_id, "");
        assert!(entry.timestamp.is_none());
        // The raw bag still holds the original values.
        assert!(entry.raw.contains_key("sessionId"));
    }

    #[test]
    fn test_declared_field_probe_wins_over_loose_phrase() {
        // A bare-string message with an inline declared field and no
        // structured usage object.
        let line = r#"{"type": "user", "message": "saw \"input_tokens\": 40 in the response"}"#;
        let entry = decoder().decode_line(line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.input_tokens, 40);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_loose_phrase_probe() {
        let probed = decoder()
            .extract_usage_from_text("used input of 1200 tokens and output of 300 tokens")
            .unwrap();
        assert_eq!(probed.input_tokens, 1200);
        assert_eq!(probed.output_tokens, 300);
    }

    #[test]
    fn test_model_extracted_from_raw_text() {
        let line = r#"{"type": "assistant", "message": "responding with claude-3-5-sonnet-20241022 now"}"#;
        let entry = decoder().decode_line(line).unwrap();
        assert_eq!(entry.model(), Some("claude-3-5-sonnet-20241022"));
    }

    #[test]
    fn test_estimate_fallback_by_role() {
        let line = r#"{"type": "user", "message": {"role": "user", "content": "one two three four five six"}}"#;
        let entry = decoder().decode_line(line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        // 6 words * 4 / 3 = 8 tokens, all input for a user role.
        assert_eq!(usage.input_tokens, 8);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_estimate_splits_when_role_unknown() {
        let usage = estimate_usage("a b c d e f g", None).unwrap();
        // 7 * 4 / 3 = 9, split 4/5.
        assert_eq!(usage.input_tokens, 4);
        assert_eq!(usage.output_tokens, 5);
    }

    #[test]
    fn test_explicit_usage_beats_estimate_and_probes() {
        let line = r#"{
            "type": "assistant",
            "message": {
                "role": "assistant",
                "content": "the run reported \"input_tokens\": 9999",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }
        }"#
        .replace('\n', " ");
        let entry = decoder().decode_line(&line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
    }

    #[test]
    fn test_usage_as_inline_string() {
        // Some writers serialize usage as a string; it still beats both the
        // content probes and the estimate.
        let line = r#"{"type": "assistant", "message": {"role": "assistant", "content": "hi", "usage": "\"input_tokens\": 40, \"output_tokens\": 7"}}"#;
        let entry = decoder().decode_line(line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.input_tokens, 40);
        assert_eq!(usage.output_tokens, 7);
    }

    #[test]
    fn test_loose_token_field_consulted_despite_content() {
        let line = r#"{"type": "assistant", "message": {"role": "assistant", "content": "short reply", "tokens": "\"output_tokens\": 12"}}"#;
        let entry = decoder().decode_line(line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.output_tokens, 12);
        // Content is untouched by the fallback fields.
        let message = entry.message.unwrap();
        assert_eq!(message.content.as_deref(), Some("short reply"));
    }

    #[test]
    fn test_loose_token_field_backs_up_empty_usage_object() {
        let line = r#"{"type": "assistant", "message": {"role": "assistant", "usage": {}, "token_count": "\"input_tokens\": 5"}}"#;
        let entry = decoder().decode_line(line).unwrap();
        let usage = entry.extracted_usage.unwrap();
        assert_eq!(usage.input_tokens, 5);
    }

    #[test]
    fn test_content_blocks_joined() {
        let line = r#"{
            "type": "user",
            "message": {"content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "World"}
            ]}
        }"#
        .replace('\n', " ");
        let entry = decoder().decode_line(&line).unwrap();
        let message = entry.message.unwrap();
        assert_eq!(message.content.as_deref(), Some("Hello\nWorld"));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00.123Z").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00+09:00").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("15/01/2024").is_none());
    }
}
