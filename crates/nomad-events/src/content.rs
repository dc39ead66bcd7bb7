//! Long-form description carried in an event's `content` field.
//!
//! Producers write either a JSON object (`{"content": "..."}`, older
//! clients used `description`) or raw markdown. Decoding accepts both.

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct DescriptionBody<'a> {
    content: &'a str,
}

pub fn encode_description(text: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&DescriptionBody { content: text })
}

/// Extracts the description from `content`, using `fallback` when empty.
/// The text is kept as written so an edit republishes it unchanged.
pub fn decode_description(content: &str, fallback: &str) -> String {
    let text = if content.trim().is_empty() {
        String::new()
    } else {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => ["content", "description"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|value| !value.is_empty())
                .unwrap_or_default()
                .to_string(),
            Ok(Value::String(text)) => text,
            _ => content.to_string(),
        }
    };

    let text = text.trim();
    if text.is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

/// Description as shown on a detail view: drops a trailing run like
/// "\n#NOMAD#RUST" that some clients append.
pub fn display_description(text: &str) -> String {
    let body = text.trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '#');
    let tail = &text[body.len()..];
    match tail.find('#') {
        Some(pos) if tail.len() > pos + 1 => {
            let kept = &text[..body.len() + pos];
            kept.trim_end_matches('\n').trim().to_string()
        }
        _ => text.trim().to_string(),
    }
}
