//! Common surface over the replaceable listing types.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::NomadKinds;
use crate::error::{DecodeError, Error};
use crate::events::{EventDraft, RawEvent};
use crate::media::Attachment;
use crate::meetup::{self, MeetupData, MeetupEvent, MeetupPatch};
use crate::product::{self, ProductData, ProductEvent, ProductPatch};
use crate::validation::ValidationErrors;
use crate::work::{self, WorkData, WorkEvent, WorkPatch};

/// Result of applying a patch to a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    pub data: T,
    pub changed: bool,
}

impl<T: PartialEq> Merged<T> {
    pub fn compare(current: &T, data: T) -> Self {
        let changed = *current != data;
        Self { data, changed }
    }
}

pub(crate) fn merge_field<T: Clone>(current: &T, patch: &Option<T>) -> T {
    patch.as_ref().unwrap_or(current).clone()
}

/// An empty patch value clears an optional field.
pub(crate) fn merge_optional(current: &Option<String>, patch: &Option<String>) -> Option<String> {
    match patch {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.clone()),
        None => current.clone(),
    }
}

/// A listing type stored as a parameterized replaceable event.
pub trait Listing: Send + Sync + 'static {
    type Data: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Event: Clone + Serialize + Send + Sync + 'static;
    type Patch: Clone + Default + Send + Sync + 'static;

    /// Human-readable name used in logs and errors.
    const NAME: &'static str;
    /// Prefix of generated `d` tags.
    const D_PREFIX: &'static str;

    fn kind(kinds: &NomadKinds) -> u16;
    fn system_tag(kinds: &NomadKinds) -> &str;

    /// Tag used for category browsing, when the type has one.
    fn category_tag() -> Option<&'static str> {
        None
    }

    fn validate(data: &Self::Data) -> ValidationErrors;
    fn encode(data: &Self::Data, d: &str, kinds: &NomadKinds) -> Result<EventDraft, Error>;
    fn decode(event: &RawEvent, kinds: &NomadKinds) -> Result<Self::Event, DecodeError>;
    fn merge(current: &Self::Data, patch: &Self::Patch) -> Merged<Self::Data>;
    fn to_data(event: &Self::Event) -> Self::Data;

    fn attachments(data: &Self::Data) -> Vec<Attachment>;
    fn set_attachments(data: &mut Self::Data, attachments: Vec<Attachment>);

    fn event_id(event: &Self::Event) -> &str;
    fn d_tag(event: &Self::Event) -> &str;
    fn pubkey(event: &Self::Event) -> &str;
    fn created_at(event: &Self::Event) -> u64;
}

pub struct Work;
pub struct Product;
pub struct Meetup;

impl Listing for Work {
    type Data = WorkData;
    type Event = WorkEvent;
    type Patch = WorkPatch;

    const NAME: &'static str = "work";
    const D_PREFIX: &'static str = "work";

    fn kind(kinds: &NomadKinds) -> u16 {
        kinds.work
    }

    fn system_tag(kinds: &NomadKinds) -> &str {
        &kinds.work_system_tag
    }

    fn category_tag() -> Option<&'static str> {
        Some("category")
    }

    fn validate(data: &WorkData) -> ValidationErrors {
        work::validate_work(data)
    }

    fn encode(data: &WorkData, d: &str, kinds: &NomadKinds) -> Result<EventDraft, Error> {
        Ok(work::encode_work(data, d, kinds)?)
    }

    fn decode(event: &RawEvent, kinds: &NomadKinds) -> Result<WorkEvent, DecodeError> {
        work::decode_work(event, kinds)
    }

    fn merge(current: &WorkData, patch: &WorkPatch) -> Merged<WorkData> {
        work::merge_work(current, patch)
    }

    fn to_data(event: &WorkEvent) -> WorkData {
        event.to_data()
    }

    fn attachments(data: &WorkData) -> Vec<Attachment> {
        data.attachments.clone()
    }

    fn set_attachments(data: &mut WorkData, attachments: Vec<Attachment>) {
        data.attachments = attachments;
    }

    fn event_id(event: &WorkEvent) -> &str {
        &event.id
    }

    fn d_tag(event: &WorkEvent) -> &str {
        &event.d_tag
    }

    fn pubkey(event: &WorkEvent) -> &str {
        &event.pubkey
    }

    fn created_at(event: &WorkEvent) -> u64 {
        event.created_at
    }
}

impl Listing for Product {
    type Data = ProductData;
    type Event = ProductEvent;
    type Patch = ProductPatch;

    const NAME: &'static str = "product";
    const D_PREFIX: &'static str = "product";

    fn kind(kinds: &NomadKinds) -> u16 {
        kinds.product
    }

    fn system_tag(kinds: &NomadKinds) -> &str {
        &kinds.product_system_tag
    }

    fn category_tag() -> Option<&'static str> {
        Some("category")
    }

    fn validate(data: &ProductData) -> ValidationErrors {
        product::validate_product(data)
    }

    fn encode(data: &ProductData, d: &str, kinds: &NomadKinds) -> Result<EventDraft, Error> {
        Ok(product::encode_product(data, d, kinds)?)
    }

    fn decode(event: &RawEvent, kinds: &NomadKinds) -> Result<ProductEvent, DecodeError> {
        product::decode_product(event, kinds)
    }

    fn merge(current: &ProductData, patch: &ProductPatch) -> Merged<ProductData> {
        product::merge_product(current, patch)
    }

    fn to_data(event: &ProductEvent) -> ProductData {
        event.to_data()
    }

    fn attachments(data: &ProductData) -> Vec<Attachment> {
        data.attachments.clone()
    }

    fn set_attachments(data: &mut ProductData, attachments: Vec<Attachment>) {
        data.attachments = attachments;
    }

    fn event_id(event: &ProductEvent) -> &str {
        &event.id
    }

    fn d_tag(event: &ProductEvent) -> &str {
        &event.d_tag
    }

    fn pubkey(event: &ProductEvent) -> &str {
        &event.pubkey
    }

    fn created_at(event: &ProductEvent) -> u64 {
        event.created_at
    }
}

impl Listing for Meetup {
    type Data = MeetupData;
    type Event = MeetupEvent;
    type Patch = MeetupPatch;

    const NAME: &'static str = "meetup";
    const D_PREFIX: &'static str = "meetup";

    fn kind(kinds: &NomadKinds) -> u16 {
        kinds.meetup
    }

    fn system_tag(kinds: &NomadKinds) -> &str {
        &kinds.meetup_system_tag
    }

    fn validate(data: &MeetupData) -> ValidationErrors {
        meetup::validate_meetup(data)
    }

    fn encode(data: &MeetupData, d: &str, kinds: &NomadKinds) -> Result<EventDraft, Error> {
        Ok(meetup::encode_meetup(data, d, kinds))
    }

    fn decode(event: &RawEvent, kinds: &NomadKinds) -> Result<MeetupEvent, DecodeError> {
        meetup::decode_meetup(event, kinds)
    }

    fn merge(current: &MeetupData, patch: &MeetupPatch) -> Merged<MeetupData> {
        meetup::merge_meetup(current, patch)
    }

    fn to_data(event: &MeetupEvent) -> MeetupData {
        event.to_data()
    }

    /// Meetups carry a single cover image.
    fn attachments(data: &MeetupData) -> Vec<Attachment> {
        data.image_url
            .iter()
            .map(|url| Attachment::new(url.clone(), crate::media::MediaKind::Image))
            .collect()
    }

    fn set_attachments(data: &mut MeetupData, attachments: Vec<Attachment>) {
        data.image_url = attachments
            .into_iter()
            .find(|a| a.kind == crate::media::MediaKind::Image)
            .map(|a| a.url);
    }

    fn event_id(event: &MeetupEvent) -> &str {
        &event.id
    }

    fn d_tag(event: &MeetupEvent) -> &str {
        &event.d_tag
    }

    fn pubkey(event: &MeetupEvent) -> &str {
        &event.pubkey
    }

    fn created_at(event: &MeetupEvent) -> u64 {
        event.created_at
    }
}
