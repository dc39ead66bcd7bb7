//! Typed decode step shared by every domain codec.
//!
//! A decoder builds one [`TagReader`] per event and pulls fields from it in
//! schema order. Missing required tags surface as [`DecodeError`] so a record
//! is never partially populated.

use std::collections::HashSet;

use tracing::warn;

use crate::error::DecodeError;
use crate::events::{tag_value, tag_values, RawEvent, SYSTEM_TAG_PREFIX};

pub struct TagReader<'a> {
    event: &'a RawEvent,
}

impl<'a> TagReader<'a> {
    pub fn new(event: &'a RawEvent) -> Self {
        Self { event }
    }

    pub fn event(&self) -> &'a RawEvent {
        self.event
    }

    pub fn expect_kind(&self, expected: u16) -> Result<(), DecodeError> {
        if self.event.kind != expected {
            return Err(DecodeError::WrongKind {
                expected,
                actual: self.event.kind,
            });
        }
        Ok(())
    }

    pub fn expect_system_tag(&self, system_tag: &str) -> Result<(), DecodeError> {
        if !self.event.has_tag_value("t", system_tag) {
            return Err(DecodeError::MissingSystemTag(system_tag.to_string()));
        }
        Ok(())
    }

    /// First value of a required tag; empty values count as missing.
    pub fn require(&self, key: &'static str) -> Result<&'a str, DecodeError> {
        self.optional(key).ok_or(DecodeError::MissingTag(key))
    }

    pub fn optional(&self, key: &str) -> Option<&'a str> {
        tag_value(&self.event.tags, key).filter(|value| !value.is_empty())
    }

    pub fn all(&self, key: &str) -> Vec<&'a str> {
        tag_values(&self.event.tags, key)
    }

    /// Decimal value of a required tag. A malformed value decodes as `0`.
    pub fn number_or_zero(&self, key: &'static str) -> Result<f64, DecodeError> {
        let raw = self.require(key)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => {
                warn!(
                    event_id = %self.event.id,
                    tag = key,
                    value = raw,
                    "Malformed numeric tag, defaulting to 0"
                );
                Ok(0.0)
            }
        }
    }

    /// Integer value of a required tag; malformed values are rejected.
    pub fn require_integer(&self, key: &'static str) -> Result<u64, DecodeError> {
        let raw = self.require(key)?;
        raw.trim()
            .parse::<u64>()
            .map_err(|_| DecodeError::InvalidValue {
                tag: key,
                value: raw.to_string(),
            })
    }

    /// Integer value of an optional tag; malformed values are logged and dropped.
    pub fn optional_integer(&self, key: &str) -> Option<u64> {
        let raw = self.optional(key)?;
        match raw.trim().parse::<u64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(event_id = %self.event.id, tag = key, value = raw, "Ignoring malformed integer tag");
                None
            }
        }
    }

    /// `t` values chosen by the user, i.e. without any system marker.
    pub fn user_tags(&self, system_tag: &str) -> Vec<String> {
        self.all("t")
            .into_iter()
            .filter(|value| *value != system_tag && !value.starts_with(SYSTEM_TAG_PREFIX))
            .map(String::from)
            .collect()
    }

    /// Values of tags that are not part of the record schema, in event order.
    pub fn general_tags(&self, schema_keys: &[&str]) -> Vec<String> {
        let known: HashSet<&str> = schema_keys.iter().copied().collect();
        self.event
            .tags
            .iter()
            .filter(|tag| !known.contains(tag.name.as_str()))
            .filter_map(|tag| tag.value())
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect()
    }
}
