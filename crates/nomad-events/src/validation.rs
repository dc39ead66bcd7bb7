//! Field-level business rules applied to drafts before they are encoded.
//!
//! Validators are pure: they never touch the network and only log at
//! `debug` when a draft is rejected. A draft is valid iff the returned
//! [`ValidationErrors`] map is empty.

use std::collections::BTreeMap;
use std::fmt;

/// Minimum trimmed length of a title or meetup name.
pub const MIN_TITLE_CHARS: usize = 3;

/// Minimum trimmed length of a long-form description.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Field name to human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    /// Converts to `Err(self)` when any rule failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn require_min_chars(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        min: usize,
        message: &str,
    ) {
        let len = value.map(|v| v.trim().chars().count()).unwrap_or(0);
        if len < min {
            self.insert(field, message);
        }
    }

    pub fn require_present(&mut self, field: &'static str, value: Option<&str>, message: &str) {
        if value.map(|v| v.trim().is_empty()).unwrap_or(true) {
            self.insert(field, message);
        }
    }

    pub fn require_non_negative(
        &mut self,
        field: &'static str,
        value: Option<f64>,
        missing: &str,
        negative: &str,
    ) {
        match value {
            None => self.insert(field, missing),
            Some(v) if !v.is_finite() => self.insert(field, negative),
            Some(v) if v < 0.0 => self.insert(field, negative),
            Some(_) => {}
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_chars_counts_trimmed_characters() {
        let mut errors = ValidationErrors::new();
        errors.require_min_chars("title", Some("  ab  "), 3, "too short");
        assert_eq!(errors.get("title"), Some("too short"));

        let mut errors = ValidationErrors::new();
        errors.require_min_chars("title", Some("abc"), 3, "too short");
        assert!(errors.is_valid());
    }

    #[test]
    fn test_min_chars_counts_unicode_scalars() {
        let mut errors = ValidationErrors::new();
        errors.require_min_chars("title", Some("日本語"), 3, "too short");
        assert!(errors.is_valid());
    }

    #[test]
    fn test_non_negative_rules() {
        let mut errors = ValidationErrors::new();
        errors.require_non_negative("price", Some(0.0), "missing", "negative");
        assert!(errors.is_valid());

        errors.require_non_negative("price", Some(-0.5), "missing", "negative");
        assert_eq!(errors.get("price"), Some("negative"));

        let mut errors = ValidationErrors::new();
        errors.require_non_negative("price", Some(f64::NAN), "missing", "negative");
        assert_eq!(errors.get("price"), Some("negative"));

        let mut errors = ValidationErrors::new();
        errors.require_non_negative("price", None, "missing", "negative");
        assert_eq!(errors.get("price"), Some("missing"));
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.require_present("category", None, "Category is required");
        errors.require_present("country", Some(" "), "Country is required");
        assert_eq!(errors.to_string(), "Category is required, Country is required");
        assert!(errors.into_result().is_err());
    }
}
