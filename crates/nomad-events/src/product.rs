//! Marketplace products (NIP-23 long-form, `nostr-for-nomads-shop`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NomadKinds;
use crate::content::{decode_description, display_description, encode_description};
use crate::error::DecodeError;
use crate::events::{d_tag, simple_tag, t_tag, EventDraft, RawEvent};
use crate::listing::{merge_field, Merged};
use crate::media::{extract_media, media_tags, Attachment, MediaSet};
use crate::schema::TagReader;
use crate::validation::{ValidationErrors, MIN_DESCRIPTION_CHARS, MIN_TITLE_CHARS};
use crate::work::user_tag_list;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
    pub title: String,
    pub description: String,
    pub price: f64,
    /// `BTC`, `sats` or `USD`.
    pub currency: String,
    pub category: String,
    /// `new`, `used` or `refurbished`.
    pub condition: String,
    pub location: String,
    pub contact: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEvent {
    pub id: String,
    pub d_tag: String,
    pub pubkey: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    pub contact: String,
    pub tags: Vec<String>,
    pub media: MediaSet,
    pub created_at: u64,
    pub published_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Compact projection used by product grids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: String,
    pub d_tag: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub pubkey: String,
    pub created_at: u64,
}

pub fn validate_product(data: &ProductData) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    errors.require_min_chars(
        "title",
        Some(data.title.as_str()),
        MIN_TITLE_CHARS,
        "Title must be at least 3 characters",
    );
    errors.require_min_chars(
        "description",
        Some(data.description.as_str()),
        MIN_DESCRIPTION_CHARS,
        "Description must be at least 10 characters",
    );
    errors.require_non_negative(
        "price",
        Some(data.price),
        "Price is required",
        "Price must be a positive number",
    );
    errors.require_present("currency", Some(data.currency.as_str()), "Currency is required");
    errors.require_present("category", Some(data.category.as_str()), "Category is required");
    errors.require_present("condition", Some(data.condition.as_str()), "Condition is required");
    errors.require_present("location", Some(data.location.as_str()), "Location is required");
    errors.require_present("contact", Some(data.contact.as_str()), "Contact is required");

    if !errors.is_valid() {
        debug!(error_count = errors.len(), errors = %errors, "Product validation failed");
    }
    errors
}

pub fn encode_product(
    data: &ProductData,
    d: &str,
    kinds: &NomadKinds,
) -> Result<EventDraft, serde_json::Error> {
    let mut tags = vec![
        d_tag(d),
        t_tag(&kinds.product_system_tag),
        simple_tag("title", data.title.trim()),
        simple_tag("price", data.price.to_string()),
        simple_tag("currency", &data.currency),
        simple_tag("category", &data.category),
        simple_tag("condition", &data.condition),
        simple_tag("location", data.location.trim()),
        simple_tag("contact", data.contact.trim()),
    ];
    tags.extend(user_tag_list(&data.tags, &kinds.product_system_tag));
    tags.extend(media_tags(&data.attachments));

    let content = encode_description(data.description.trim())?;
    Ok(EventDraft::new(kinds.product, content).with_tags(tags))
}

pub fn decode_product(event: &RawEvent, kinds: &NomadKinds) -> Result<ProductEvent, DecodeError> {
    let reader = TagReader::new(event);
    reader.expect_kind(kinds.product)?;
    reader.expect_system_tag(&kinds.product_system_tag)?;

    let d = reader.require("d")?;
    let title = reader.require("title")?;
    let price = reader.number_or_zero("price")?;
    let currency = reader.require("currency")?;
    let category = reader.require("category")?;
    let condition = reader.require("condition")?;
    let location = reader.require("location")?;
    let contact = reader.require("contact")?;

    Ok(ProductEvent {
        id: event.id.clone(),
        d_tag: d.to_string(),
        pubkey: event.pubkey.clone(),
        title: title.to_string(),
        summary: reader.optional("summary").unwrap_or(title).to_string(),
        description: decode_description(&event.content, ""),
        price,
        currency: currency.to_string(),
        category: category.to_string(),
        condition: condition.to_string(),
        location: location.to_string(),
        contact: contact.to_string(),
        tags: reader.user_tags(&kinds.product_system_tag),
        media: extract_media(&event.tags),
        created_at: event.created_at,
        published_at: reader
            .optional_integer("published_at")
            .unwrap_or(event.created_at),
    })
}

pub fn merge_product(current: &ProductData, patch: &ProductPatch) -> Merged<ProductData> {
    let data = ProductData {
        title: merge_field(&current.title, &patch.title),
        description: merge_field(&current.description, &patch.description),
        price: patch.price.unwrap_or(current.price),
        currency: merge_field(&current.currency, &patch.currency),
        category: merge_field(&current.category, &patch.category),
        condition: merge_field(&current.condition, &patch.condition),
        location: merge_field(&current.location, &patch.location),
        contact: merge_field(&current.contact, &patch.contact),
        attachments: current.attachments.clone(),
        tags: merge_field(&current.tags, &patch.tags),
    };
    Merged::compare(current, data)
}

impl ProductEvent {
    pub fn to_data(&self) -> ProductData {
        ProductData {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            currency: self.currency.clone(),
            category: self.category.clone(),
            condition: self.condition.clone(),
            location: self.location.clone(),
            contact: self.contact.clone(),
            attachments: self.media.all(),
            tags: self.tags.clone(),
        }
    }

    pub fn card(&self) -> ProductCard {
        ProductCard {
            id: self.id.clone(),
            d_tag: self.d_tag.clone(),
            title: self.title.clone(),
            description: display_description(&self.description),
            price: self.price,
            currency: self.currency.clone(),
            category: self.category.clone(),
            condition: self.condition.clone(),
            location: self.location.clone(),
            image_url: self.media.first_url().map(String::from),
            tags: self.tags.clone(),
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
        }
    }

    pub fn price_label(&self) -> String {
        format_price(self.price, &self.currency)
    }
}

/// Formats a price for display in its currency.
pub fn format_price(price: f64, currency: &str) -> String {
    match currency.to_ascii_lowercase().as_str() {
        "btc" => format!("₿{price:.8}"),
        "sats" => format!("{} sats", group_thousands(price.round() as i64)),
        "usd" => format!("${price:.2}"),
        _ => format!("{price:.2} {currency}"),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}
