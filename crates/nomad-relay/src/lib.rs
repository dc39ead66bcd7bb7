//! Relay side of Nostr-for-Nomads: signing, publishing, querying and the
//! listing services built on top.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        NOMAD-RELAY                             │
//! │                                                                │
//! │  ┌──────────────────────┐        ┌──────────────────────┐      │
//! │  │   ListingService<L>  │        │     RsvpService      │      │
//! │  │  create / update /   │        │  rsvp / cancel /     │      │
//! │  │  fetch_*             │        │  my rsvps / attendees│      │
//! │  └──────────┬───────────┘        └──────────┬───────────┘      │
//! │             │                               │                  │
//! │     EventSigner  MediaUploader       RelayPublisher  query     │
//! │             │                               │                  │
//! │             ▼                               ▼                  │
//! │                      RelayTransport (nostr-sdk)                │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tag codecs, validation and the replace resolver live in `nomad-events`;
//! nothing here touches tag layout directly.
//!
//! # Publishing
//!
//! [`RelayPublisher::publish_optimistic`] returns at the first relay that
//! accepts the event and keeps the remaining sends running in the
//! background. [`RelayPublisher::publish`] waits for all of them and is used
//! for updates and deletions.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nomad_relay::{KeysSigner, RelayConfig, SdkRelayTransport, WorkService};
//!
//! let config = RelayConfig::from_env()?.expect("NOSTR_RELAYS not set");
//! let signer = Arc::new(KeysSigner::new(config.keys()?));
//! let transport = Arc::new(SdkRelayTransport::from_config(&config).await?);
//! let works = WorkService::new(signer, transport, config.kinds.clone());
//!
//! let page = works.fetch_public(20, None).await?;
//! ```

pub mod config;
pub mod error;
pub mod publish;
pub mod query;
pub mod rsvp;
pub mod service;
pub mod transport;
pub mod upload;

pub use config::RelayConfig;
pub use error::{AppError, Error, ErrorCategory, ErrorCode, ErrorSeverity};
pub use publish::{PublishResult, RelayPublisher, RelayStatus};
pub use query::{fetch_current, fetch_one};
pub use rsvp::{EnrichedRsvp, RsvpService};
pub use service::{
    AttachmentSelection, ListingService, MeetupService, ProductService, ProgressFn,
    PublishProgress, PublishStep, WorkService,
};
pub use transport::{EventSigner, KeysSigner, RelayTransport, SdkRelayTransport};
pub use upload::{
    upload_attachments, FailedUpload, MediaFile, MediaUploader, UploadReport, UploadedFile,
};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
