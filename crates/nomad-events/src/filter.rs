//! Relay query filters and cursor pagination.

use serde::{Deserialize, Serialize};

use crate::events::RawEvent;

/// NIP-01 filter restricted to the fields this application queries by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<u16>,
    #[serde(rename = "#t", default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(rename = "#d", default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(rename = "#category", default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
}

impl RelayFilter {
    /// Filter for one domain type: its kind pinned to its system tag.
    pub fn for_type(kind: u16, system_tag: &str) -> Self {
        Self {
            kinds: vec![kind],
            hashtags: vec![system_tag.to_string()],
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: u16) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn hashtag(mut self, tag: impl Into<String>) -> Self {
        self.hashtags.push(tag.into());
        self
    }

    pub fn identifier(mut self, d: impl Into<String>) -> Self {
        self.identifiers.push(d.into());
        self
    }

    pub fn author(mut self, pubkey: impl Into<String>) -> Self {
        self.authors.push(pubkey.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Client-side check of everything except `limit`. Relays do not
    /// reliably index multi-letter tags such as `#category`, so results are
    /// re-checked after every query.
    pub fn matches(&self, event: &RawEvent) -> bool {
        let any_tag = |name: &str, wanted: &[String]| {
            wanted.is_empty() || wanted.iter().any(|value| event.has_tag_value(name, value))
        };

        (self.kinds.is_empty() || self.kinds.contains(&event.kind))
            && (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && self.until.map_or(true, |until| event.created_at <= until)
            && any_tag("t", &self.hashtags)
            && any_tag("d", &self.identifiers)
            && any_tag("category", &self.categories)
    }
}

/// One page of newest-first results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page: `created_at` of the last item.
    pub next_until: Option<u64>,
    /// A full page suggests more results may exist; it is not a guarantee.
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, limit: Option<usize>, last_created_at: Option<u64>) -> Self {
        let has_more = limit.map_or(false, |limit| limit > 0 && items.len() == limit);
        Self {
            items,
            next_until: last_created_at,
            has_more,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_until: None,
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
