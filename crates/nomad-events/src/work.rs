//! Work opportunity listings (NIP-23 long-form, `nostr-for-nomads-work`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{self, WORK_CATEGORIES, WORK_CURRENCIES, WORK_DURATIONS, WORK_JOB_TYPES};
use crate::config::NomadKinds;
use crate::content::{decode_description, display_description, encode_description};
use crate::error::DecodeError;
use crate::events::{d_tag, simple_tag, t_tag, EventDraft, RawEvent};
use crate::listing::{merge_field, merge_optional, Merged};
use crate::media::{extract_media, media_tags, Attachment, MediaSet};
use crate::schema::TagReader;
use crate::validation::{ValidationErrors, MIN_DESCRIPTION_CHARS, MIN_TITLE_CHARS};

/// Tags owned by the work schema; anything else is a general tag.
const WORK_SCHEMA_TAGS: &[&str] = &[
    "d", "t", "title", "summary", "published_at", "category", "job-type", "duration", "region",
    "country", "pay-rate", "currency", "language", "location", "contact", "image", "video",
    "audio", "imeta",
];

/// Draft of a work listing as filled in by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkData {
    pub title: String,
    pub category: String,
    pub job_type: String,
    pub description: String,
    pub duration: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub region: String,
    pub country: String,
    pub pay_rate: f64,
    pub currency: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// A work listing decoded from a relay event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkEvent {
    pub id: String,
    pub d_tag: String,
    pub pubkey: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub category: String,
    pub job_type: String,
    pub duration: String,
    pub region: String,
    pub country: String,
    pub pay_rate: f64,
    pub currency: String,
    pub language: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub tags: Vec<String>,
    pub general_tags: Vec<String>,
    pub media: MediaSet,
    pub created_at: u64,
    pub published_at: u64,
}

/// Fields to change on an existing listing. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub language: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub pay_rate: Option<f64>,
    pub currency: Option<String>,
    pub tags: Option<Vec<String>>,
    pub contact: Option<String>,
}

impl From<&WorkData> for WorkPatch {
    fn from(data: &WorkData) -> Self {
        Self {
            title: Some(data.title.clone()),
            category: Some(data.category.clone()),
            job_type: Some(data.job_type.clone()),
            description: Some(data.description.clone()),
            duration: Some(data.duration.clone()),
            language: data.language.clone(),
            location: data.location.clone(),
            region: Some(data.region.clone()),
            country: Some(data.country.clone()),
            pay_rate: Some(data.pay_rate),
            currency: Some(data.currency.clone()),
            tags: Some(data.tags.clone()),
            contact: data.contact.clone(),
        }
    }
}

/// Validates a possibly incomplete work draft.
pub fn validate_work_draft(draft: &WorkPatch) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    errors.require_min_chars(
        "title",
        draft.title.as_deref(),
        MIN_TITLE_CHARS,
        "Title must be at least 3 characters",
    );
    errors.require_present("category", draft.category.as_deref(), "Category is required");
    errors.require_present("job_type", draft.job_type.as_deref(), "Job type is required");
    errors.require_present("duration", draft.duration.as_deref(), "Duration is required");
    errors.require_non_negative(
        "pay_rate",
        draft.pay_rate,
        "Pay rate is required",
        "Pay rate must be a positive number",
    );
    errors.require_present("currency", draft.currency.as_deref(), "Currency is required");
    errors.require_min_chars(
        "description",
        draft.description.as_deref(),
        MIN_DESCRIPTION_CHARS,
        "Description must be at least 10 characters",
    );
    errors.require_present("region", draft.region.as_deref(), "Region is required");
    errors.require_present("country", draft.country.as_deref(), "Country is required");

    if !errors.is_valid() {
        debug!(error_count = errors.len(), errors = %errors, "Work validation failed");
    }
    errors
}

pub fn validate_work(data: &WorkData) -> ValidationErrors {
    validate_work_draft(&WorkPatch::from(data))
}

/// Builds the unsigned work event for `data` under identifier `d`.
pub fn encode_work(
    data: &WorkData,
    d: &str,
    kinds: &NomadKinds,
) -> Result<EventDraft, serde_json::Error> {
    let mut tags = vec![
        d_tag(d),
        t_tag(&kinds.work_system_tag),
        simple_tag("title", data.title.trim()),
        simple_tag("category", &data.category),
        simple_tag("job-type", &data.job_type),
        simple_tag("duration", &data.duration),
        simple_tag("region", &data.region),
        simple_tag("country", &data.country),
        simple_tag("pay-rate", data.pay_rate.to_string()),
        simple_tag("currency", &data.currency),
    ];

    for (key, value) in [
        ("language", &data.language),
        ("location", &data.location),
        ("contact", &data.contact),
    ] {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            tags.push(simple_tag(key, value));
        }
    }

    tags.extend(user_tag_list(&data.tags, &kinds.work_system_tag));
    tags.extend(media_tags(&data.attachments));

    let content = encode_description(data.description.trim())?;
    Ok(EventDraft::new(kinds.work, content).with_tags(tags))
}

/// Decodes a relay event into a work listing.
pub fn decode_work(event: &RawEvent, kinds: &NomadKinds) -> Result<WorkEvent, DecodeError> {
    let reader = TagReader::new(event);
    reader.expect_kind(kinds.work)?;
    reader.expect_system_tag(&kinds.work_system_tag)?;

    let d_tag = reader.require("d")?;
    let title = reader.require("title")?;
    let category = reader.require("category")?;
    let job_type = reader.require("job-type")?;
    let duration = reader.require("duration")?;
    let region = reader.require("region")?;
    let country = reader.require("country")?;
    let pay_rate = reader.number_or_zero("pay-rate")?;
    let currency = reader.require("currency")?;

    Ok(WorkEvent {
        id: event.id.clone(),
        d_tag: d_tag.to_string(),
        pubkey: event.pubkey.clone(),
        title: title.to_string(),
        summary: reader.optional("summary").unwrap_or(title).to_string(),
        description: decode_description(&event.content, ""),
        category: category.to_string(),
        job_type: job_type.to_string(),
        duration: duration.to_string(),
        region: region.to_string(),
        country: country.to_string(),
        pay_rate,
        currency: currency.to_string(),
        language: reader.optional("language").map(String::from),
        location: reader.optional("location").map(String::from),
        contact: reader.optional("contact").map(String::from),
        tags: reader.user_tags(&kinds.work_system_tag),
        general_tags: reader.general_tags(WORK_SCHEMA_TAGS),
        media: extract_media(&event.tags),
        created_at: event.created_at,
        published_at: reader
            .optional_integer("published_at")
            .unwrap_or(event.created_at),
    })
}

impl WorkEvent {
    /// Draft carrying this listing's current values, for editing.
    pub fn to_data(&self) -> WorkData {
        WorkData {
            title: self.title.clone(),
            category: self.category.clone(),
            job_type: self.job_type.clone(),
            description: self.description.clone(),
            duration: self.duration.clone(),
            language: self.language.clone(),
            location: self.location.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            pay_rate: self.pay_rate,
            currency: self.currency.clone(),
            attachments: self.media.all(),
            tags: self.tags.clone(),
            contact: self.contact.clone(),
        }
    }

    /// Description for the detail view, without a trailing hashtag run.
    pub fn display_description(&self) -> String {
        display_description(&self.description)
    }

    /// Label/value pairs shown on a listing's detail view.
    pub fn detail_meta(&self) -> Vec<(&'static str, String)> {
        let mut meta = vec![
            (
                "Job Type",
                catalog::display_name(WORK_JOB_TYPES, &self.job_type).to_string(),
            ),
            (
                "Duration",
                catalog::display_name(WORK_DURATIONS, &self.duration).to_string(),
            ),
            ("Pay Rate", self.pay_rate_label()),
            (
                "Category",
                catalog::display_name(WORK_CATEGORIES, &self.category).to_string(),
            ),
            ("Region", self.region.clone()),
            ("Country", self.country.clone()),
        ];
        if let Some(location) = &self.location {
            meta.push(("Location", location.clone()));
        }
        if let Some(contact) = &self.contact {
            meta.push(("Contact", contact.clone()));
        }
        if let Some(language) = &self.language {
            meta.push(("Language", language.clone()));
        }
        meta
    }

    fn pay_rate_label(&self) -> String {
        match catalog::find(WORK_CURRENCIES, &self.currency) {
            Some(currency) if currency.detail.starts_with('/') => {
                format!("{}{}", self.pay_rate, currency.detail)
            }
            Some(currency) if currency.id == "sats" => format!("{} sats", self.pay_rate),
            Some(currency) => format!("{}{}", currency.detail, self.pay_rate),
            None => format!("{} {}", self.pay_rate, self.currency),
        }
    }
}

/// Applies `patch` on top of `current`.
pub fn merge_work(current: &WorkData, patch: &WorkPatch) -> Merged<WorkData> {
    let data = WorkData {
        title: merge_field(&current.title, &patch.title),
        category: merge_field(&current.category, &patch.category),
        job_type: merge_field(&current.job_type, &patch.job_type),
        description: merge_field(&current.description, &patch.description),
        duration: merge_field(&current.duration, &patch.duration),
        language: merge_optional(&current.language, &patch.language),
        location: merge_optional(&current.location, &patch.location),
        region: merge_field(&current.region, &patch.region),
        country: merge_field(&current.country, &patch.country),
        pay_rate: patch.pay_rate.unwrap_or(current.pay_rate),
        currency: merge_field(&current.currency, &patch.currency),
        attachments: current.attachments.clone(),
        tags: merge_field(&current.tags, &patch.tags),
        contact: merge_optional(&current.contact, &patch.contact),
    };
    Merged::compare(current, data)
}

/// `t` tags for user-chosen keywords, skipping blanks and system markers.
pub(crate) fn user_tag_list(tags: &[String], system_tag: &str) -> Vec<crate::events::NostrTag> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty() && *tag != system_tag)
        .filter(|tag| !tag.starts_with(crate::events::SYSTEM_TAG_PREFIX))
        .map(t_tag)
        .collect()
}
