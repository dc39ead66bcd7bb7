use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Prefix shared by every system tag this application publishes.
pub const SYSTEM_TAG_PREFIX: &str = "nostr-for-nomads-";

/// One Nostr tag: a name followed by its values.
///
/// Serialises as the flat string array used on the wire, so
/// `NostrTag::new("t", vec!["rust".into()])` becomes `["t","rust"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NostrTag {
    pub name: String,
    pub values: Vec<String>,
}

impl NostrTag {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// First value of the tag, if any.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Value at a position counted from the tag name (`1` is the first value).
    pub fn position(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(1 + self.values.len());
        parts.push(self.name.clone());
        parts.extend(self.values.iter().cloned());
        parts
    }

    pub fn from_vec(parts: Vec<String>) -> Self {
        let mut iter = parts.into_iter();
        let name = iter.next().unwrap_or_default();
        Self {
            name,
            values: iter.collect(),
        }
    }
}

impl Serialize for NostrTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + self.values.len()))?;
        seq.serialize_element(&self.name)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for NostrTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVisitor;

        impl<'de> Visitor<'de> for TagVisitor {
            type Value = NostrTag;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-empty array of strings")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut parts: Vec<String> = Vec::with_capacity(seq.size_hint().unwrap_or(2));
                while let Some(part) = seq.next_element()? {
                    parts.push(part);
                }
                if parts.is_empty() {
                    return Err(de::Error::invalid_length(0, &self));
                }
                Ok(NostrTag::from_vec(parts))
            }
        }

        deserializer.deserialize_seq(TagVisitor)
    }
}

/// A signed event as received from or sent to relays (NIP-01 JSON shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<NostrTag>,
    pub content: String,
    pub sig: String,
}

impl RawEvent {
    pub fn d_tag(&self) -> Option<&str> {
        tag_value(&self.tags, "d")
    }

    pub fn has_tag_value(&self, name: &str, value: &str) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.name == name && tag.value() == Some(value))
    }

    /// Replaceable-event address `<kind>:<pubkey>:<d>`.
    pub fn address(&self) -> Option<String> {
        self.d_tag()
            .map(|d| coordinate(self.kind, &self.pubkey, d))
    }
}

/// Unsigned event produced by the codecs and handed to a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub kind: u16,
    pub tags: Vec<NostrTag>,
    pub content: String,
    pub created_at: Option<u64>,
}

impl EventDraft {
    pub fn new(kind: u16, content: impl Into<String>) -> Self {
        Self {
            kind,
            tags: Vec::new(),
            content: content.into(),
            created_at: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<NostrTag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn created_at(mut self, timestamp: u64) -> Self {
        self.created_at = Some(timestamp);
        self
    }

    pub fn d_tag(&self) -> Option<&str> {
        tag_value(&self.tags, "d")
    }
}

pub fn simple_tag(name: &str, value: impl Into<String>) -> NostrTag {
    NostrTag::new(name, vec![value.into()])
}

pub fn d_tag(id: &str) -> NostrTag {
    simple_tag("d", id)
}

pub fn t_tag(value: &str) -> NostrTag {
    simple_tag("t", value)
}

pub fn tag_value<'a>(tags: &'a [NostrTag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.name == name)
        .and_then(|tag| tag.value())
}

pub fn tag_values<'a>(tags: &'a [NostrTag], name: &str) -> Vec<&'a str> {
    tags.iter()
        .filter(|tag| tag.name == name)
        .filter_map(|tag| tag.value())
        .collect()
}

pub fn coordinate(kind: u16, pubkey: &str, d: &str) -> String {
    format!("{kind}:{pubkey}:{d}")
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Fresh identifier for a record's first publish: `<prefix>-<secs>-<8 hex>`.
pub fn generate_d_tag(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", unix_timestamp(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serializes_as_flat_array() {
        let tag = NostrTag::new("p", vec!["abc".into(), "".into(), "host".into()]);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"["p","abc","","host"]"#);
        let parsed: NostrTag = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tag);
        assert_eq!(parsed.position(3), Some("host"));
    }

    #[test]
    fn test_empty_tag_rejected() {
        assert!(serde_json::from_str::<NostrTag>("[]").is_err());
    }

    #[test]
    fn test_raw_event_parses_nip01_json() {
        let json = r#"{
            "id": "aa11",
            "pubkey": "bb22",
            "created_at": 1700000000,
            "kind": 30023,
            "tags": [["d", "work-1"], ["t", "nostr-for-nomads-work"]],
            "content": "{}",
            "sig": "cc33"
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.d_tag(), Some("work-1"));
        assert!(event.has_tag_value("t", "nostr-for-nomads-work"));
        assert_eq!(event.address().as_deref(), Some("30023:bb22:work-1"));
    }

    #[test]
    fn test_tag_helpers() {
        let tags = vec![d_tag("x"), t_tag("a"), t_tag("b")];
        assert_eq!(tag_value(&tags, "t"), Some("a"));
        assert_eq!(tag_values(&tags, "t"), vec!["a", "b"]);
        assert_eq!(tag_value(&tags, "missing"), None);
    }

    #[test]
    fn test_generated_d_tag_shape() {
        let d = generate_d_tag("work");
        let parts: Vec<&str> = d.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "work");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert_ne!(generate_d_tag("work"), d);
    }
}
