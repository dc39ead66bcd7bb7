//! Create, update and browse listings of one type.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use nomad_events::{
    generate_d_tag, Attachment, Listing, Meetup, NomadKinds, Page, Product, RawEvent,
    RelayFilter, Work,
};

use crate::publish::{PublishResult, RelayPublisher};
use crate::query::{fetch_current, fetch_one};
use crate::transport::{EventSigner, RelayTransport};
use crate::upload::{upload_attachments, MediaFile, MediaUploader};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Validating,
    Uploading,
    Publishing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishProgress {
    pub step: PublishStep,
    pub progress: u8,
    pub message: String,
}

pub type ProgressFn = dyn Fn(PublishProgress) + Send + Sync;

fn report(progress: Option<&ProgressFn>, step: PublishStep, percent: u8, message: String) {
    if let Some(callback) = progress {
        callback(PublishProgress {
            step,
            progress: percent,
            message,
        });
    }
}

/// Which existing attachments survive an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AttachmentSelection {
    #[default]
    KeepAll,
    Keep(Vec<String>),
}

impl AttachmentSelection {
    fn apply(&self, attachments: Vec<Attachment>) -> Vec<Attachment> {
        match self {
            AttachmentSelection::KeepAll => attachments,
            AttachmentSelection::Keep(urls) => {
                let keep: HashSet<&str> = urls.iter().map(String::as_str).collect();
                attachments
                    .into_iter()
                    .filter(|a| keep.contains(a.url.as_str()))
                    .collect()
            }
        }
    }
}

pub struct ListingService<L: Listing> {
    signer: Arc<dyn EventSigner>,
    publisher: RelayPublisher,
    uploader: Option<Arc<dyn MediaUploader>>,
    kinds: NomadKinds,
    _listing: PhantomData<fn() -> L>,
}

pub type WorkService = ListingService<Work>;
pub type ProductService = ListingService<Product>;
pub type MeetupService = ListingService<Meetup>;

impl<L: Listing> Clone for ListingService<L> {
    fn clone(&self) -> Self {
        Self {
            signer: Arc::clone(&self.signer),
            publisher: self.publisher.clone(),
            uploader: self.uploader.clone(),
            kinds: self.kinds.clone(),
            _listing: PhantomData,
        }
    }
}

impl<L: Listing> ListingService<L> {
    pub fn new(
        signer: Arc<dyn EventSigner>,
        transport: Arc<dyn RelayTransport>,
        kinds: NomadKinds,
    ) -> Self {
        Self {
            signer,
            publisher: RelayPublisher::new(transport),
            uploader: None,
            kinds,
            _listing: PhantomData,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn MediaUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn kinds(&self) -> &NomadKinds {
        &self.kinds
    }

    fn transport(&self) -> &dyn RelayTransport {
        self.publisher.transport().as_ref()
    }

    fn base_filter(&self) -> RelayFilter {
        RelayFilter::for_type(L::kind(&self.kinds), L::system_tag(&self.kinds))
    }

    fn decode(&self, event: &RawEvent) -> Result<L::Event, nomad_events::DecodeError> {
        L::decode(event, &self.kinds)
    }

    /// Publishes a new listing, or replaces `existing_d` when given.
    /// Returns as soon as one relay accepts the event.
    pub async fn create(
        &self,
        mut data: L::Data,
        files: &[MediaFile],
        existing_d: Option<&str>,
        progress: Option<&ProgressFn>,
    ) -> Result<PublishResult, Error> {
        report(
            progress,
            PublishStep::Validating,
            10,
            format!("Validating {}...", L::NAME),
        );
        L::validate(&data).into_result()?;

        if !files.is_empty() {
            report(
                progress,
                PublishStep::Uploading,
                30,
                format!("Uploading {} file(s)...", files.len()),
            );
            let uploaded = upload_attachments(self.uploader.as_deref(), files).await?;
            let mut attachments = L::attachments(&data);
            attachments.extend(uploaded);
            L::set_attachments(&mut data, attachments);
        }

        report(
            progress,
            PublishStep::Publishing,
            70,
            "Creating Nostr event...".to_string(),
        );
        let d = existing_d
            .map(String::from)
            .unwrap_or_else(|| generate_d_tag(L::D_PREFIX));
        let draft = L::encode(&data, &d, &self.kinds)?;
        let event = self.signer.sign(draft).await?;

        report(
            progress,
            PublishStep::Publishing,
            85,
            "Publishing to relays...".to_string(),
        );
        info!(event_id = %event.id, d_tag = %d, listing = L::NAME, "Publishing listing");
        let result = self.publisher.publish_optimistic(&event).await;

        if !result.success {
            error!(event_id = %event.id, failed = result.failed_relays.len(), listing = L::NAME, "Failed to publish listing");
            return Ok(publish_failure(result));
        }

        report(
            progress,
            PublishStep::Complete,
            100,
            format!(
                "Published to {} relay(s)",
                result.published_relays.len().max(1)
            ),
        );
        info!(event_id = %event.id, d_tag = %d, listing = L::NAME, "Listing created");
        Ok(result)
    }

    /// Replaces the author's own listing `d` with the patched version.
    /// Waits for every relay.
    pub async fn update(
        &self,
        d: &str,
        patch: &L::Patch,
        files: &[MediaFile],
        selection: &AttachmentSelection,
        progress: Option<&ProgressFn>,
    ) -> Result<PublishResult, Error> {
        report(
            progress,
            PublishStep::Validating,
            10,
            format!("Loading {}...", L::NAME),
        );
        let author = self.signer.public_key();
        let current = self
            .fetch_by_id(d, Some(&author))
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: L::NAME,
                id: d.to_string(),
            })?;
        let current_data = L::to_data(&current);

        let mut attachments = selection.apply(L::attachments(&current_data));
        if !files.is_empty() {
            report(
                progress,
                PublishStep::Uploading,
                30,
                format!("Uploading {} file(s)...", files.len()),
            );
            attachments.extend(upload_attachments(self.uploader.as_deref(), files).await?);
        }

        let merged = L::merge(&current_data, patch);
        let mut data = merged.data;
        L::set_attachments(&mut data, attachments);

        if data == current_data {
            info!(d_tag = %d, listing = L::NAME, "No changes, skipping update");
            report(
                progress,
                PublishStep::Complete,
                100,
                "No changes".to_string(),
            );
            return Ok(PublishResult {
                success: true,
                event_id: Some(L::event_id(&current).to_string()),
                d_tag: Some(d.to_string()),
                ..Default::default()
            });
        }

        L::validate(&data).into_result()?;

        report(
            progress,
            PublishStep::Publishing,
            70,
            "Creating replacement event...".to_string(),
        );
        let draft = L::encode(&data, d, &self.kinds)?;
        let event = self.signer.sign(draft).await?;

        report(
            progress,
            PublishStep::Publishing,
            85,
            "Publishing to relays...".to_string(),
        );
        let result = self.publisher.publish(&event).await;
        if !result.success {
            error!(event_id = %event.id, d_tag = %d, "Failed to publish replacement event");
            return Ok(publish_failure(result));
        }

        report(
            progress,
            PublishStep::Complete,
            100,
            format!("Updated on {} relay(s)", result.published_relays.len()),
        );
        info!(
            event_id = %event.id,
            d_tag = %d,
            replaced = %L::event_id(&current),
            fields_changed = merged.changed,
            "Listing updated"
        );
        Ok(result)
    }

    pub async fn fetch_public(
        &self,
        limit: usize,
        until: Option<u64>,
    ) -> Result<Page<L::Event>, Error> {
        let mut filter = self.base_filter().limit(limit);
        if let Some(until) = until {
            filter = filter.until(until);
        }
        fetch_current(self.transport(), &filter, |e| self.decode(e)).await
    }

    pub async fn fetch_by_author(
        &self,
        pubkey: &str,
        limit: usize,
        until: Option<u64>,
    ) -> Result<Page<L::Event>, Error> {
        let mut filter = self.base_filter().author(pubkey).limit(limit);
        if let Some(until) = until {
            filter = filter.until(until);
        }
        fetch_current(self.transport(), &filter, |e| self.decode(e)).await
    }

    /// Current version of listing `d`, optionally restricted to one author.
    pub async fn fetch_by_id(
        &self,
        d: &str,
        author: Option<&str>,
    ) -> Result<Option<L::Event>, Error> {
        let mut filter = self.base_filter().identifier(d);
        if let Some(author) = author {
            filter = filter.author(author);
        }
        fetch_one(self.transport(), &filter, |e| self.decode(e)).await
    }

    pub async fn fetch_by_category(
        &self,
        category: &str,
        limit: usize,
        until: Option<u64>,
    ) -> Result<Page<L::Event>, Error> {
        if L::category_tag().is_none() {
            warn!(listing = L::NAME, "Listing type has no categories");
            return Ok(Page::empty());
        }
        let mut filter = self.base_filter().category(category).limit(limit);
        if let Some(until) = until {
            filter = filter.until(until);
        }
        fetch_current(self.transport(), &filter, |e| self.decode(e)).await
    }
}

fn publish_failure(mut result: PublishResult) -> PublishResult {
    let reason = result
        .error
        .take()
        .unwrap_or_else(|| "no relay accepted the event".to_string());
    result.error = Some(format!("Failed to publish to any relay: {reason}"));
    result
}
