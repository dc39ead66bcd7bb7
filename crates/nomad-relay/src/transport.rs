//! Seams to the signing key and the relay pool, with `nostr-sdk` backends.

use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use tracing::{debug, warn};

use nomad_events::{EventDraft, NostrTag, RawEvent, RelayFilter};

use crate::config::RelayConfig;
use crate::Error;

#[async_trait]
pub trait EventSigner: Send + Sync {
    /// Hex public key of the signing author.
    fn public_key(&self) -> String;
    async fn sign(&self, draft: EventDraft) -> Result<RawEvent, Error>;
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    fn relays(&self) -> Vec<String>;
    /// Sends one event to one relay. `Ok` means the relay accepted it.
    async fn send_to(&self, relay: &str, event: &RawEvent) -> Result<(), Error>;
    async fn query(&self, filter: &RelayFilter) -> Result<Vec<RawEvent>, Error>;
}

#[derive(Clone)]
pub struct KeysSigner {
    keys: Keys,
}

impl KeysSigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn parse(secret_key: &str) -> Result<Self, Error> {
        Ok(Self::new(Keys::parse(secret_key)?))
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }
}

#[async_trait]
impl EventSigner for KeysSigner {
    fn public_key(&self) -> String {
        self.keys.public_key().to_hex()
    }

    async fn sign(&self, draft: EventDraft) -> Result<RawEvent, Error> {
        let tags = draft
            .tags
            .iter()
            .map(|tag| Tag::parse(tag.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = EventBuilder::new(Kind::from(draft.kind), draft.content).tags(tags);
        if let Some(created_at) = draft.created_at {
            builder = builder.custom_created_at(Timestamp::from(created_at));
        }

        let event = builder
            .sign_with_keys(&self.keys)
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(raw_from_sdk(&event))
    }
}

pub fn raw_from_sdk(event: &Event) -> RawEvent {
    RawEvent {
        id: event.id.to_hex(),
        pubkey: event.pubkey.to_hex(),
        created_at: event.created_at.as_secs(),
        kind: event.kind.as_u16(),
        tags: event
            .tags
            .iter()
            .map(|tag| NostrTag::from_vec(tag.clone().to_vec()))
            .collect(),
        content: event.content.clone(),
        sig: event.sig.to_string(),
    }
}

pub fn raw_to_sdk(event: &RawEvent) -> Result<Event, Error> {
    let json = serde_json::to_string(event)?;
    Ok(Event::from_json(json)?)
}

/// Filter sent to relays. Multi-letter tags (`#category`) cannot be
/// expressed and are checked client-side instead.
pub fn sdk_filter(filter: &RelayFilter) -> Result<Filter, Error> {
    let mut sdk = Filter::new();
    if !filter.kinds.is_empty() {
        sdk = sdk.kinds(filter.kinds.iter().copied().map(Kind::from));
    }
    if !filter.hashtags.is_empty() {
        sdk = sdk.hashtags(filter.hashtags.iter().cloned());
    }
    if !filter.identifiers.is_empty() {
        sdk = sdk.identifiers(filter.identifiers.iter().cloned());
    }
    if !filter.authors.is_empty() {
        let authors = filter
            .authors
            .iter()
            .map(|value| PublicKey::parse(value).map_err(Error::from))
            .collect::<Result<Vec<_>, _>>()?;
        sdk = sdk.authors(authors);
    }
    if let Some(limit) = filter.limit {
        sdk = sdk.limit(limit);
    }
    if let Some(until) = filter.until {
        sdk = sdk.until(Timestamp::from(until));
    }
    Ok(sdk)
}

/// Relay pool backed by a connected `nostr_sdk::Client`.
#[derive(Clone)]
pub struct SdkRelayTransport {
    client: Client,
    relays: Vec<String>,
    timeout: Duration,
}

impl SdkRelayTransport {
    pub async fn connect(relays: Vec<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::default();
        for relay in &relays {
            client.add_relay(relay).await?;
        }
        client.connect().await;
        Ok(Self {
            client,
            relays,
            timeout,
        })
    }

    pub async fn from_config(config: &RelayConfig) -> Result<Self, Error> {
        Self::connect(config.relays.clone(), config.timeout).await
    }
}

#[async_trait]
impl RelayTransport for SdkRelayTransport {
    fn relays(&self) -> Vec<String> {
        self.relays.clone()
    }

    async fn send_to(&self, relay: &str, event: &RawEvent) -> Result<(), Error> {
        let event = raw_to_sdk(event)?;
        let output = tokio::time::timeout(self.timeout, self.client.send_event_to([relay], &event))
            .await
            .map_err(|_| Error::Timeout)??;

        if !output.success.is_empty() {
            return Ok(());
        }
        let reason = output
            .failed
            .into_values()
            .next()
            .unwrap_or_else(|| "no acknowledgement".to_string());
        Err(Error::Relay {
            relay: relay.to_string(),
            reason,
        })
    }

    async fn query(&self, filter: &RelayFilter) -> Result<Vec<RawEvent>, Error> {
        let events = self
            .client
            .fetch_events(sdk_filter(filter)?, self.timeout)
            .await?;

        let mut raw = Vec::with_capacity(events.len());
        for event in events.iter() {
            if event.verify().is_err() {
                warn!(event_id = %event.id, "Dropping event with invalid signature");
                continue;
            }
            let parsed = raw_from_sdk(event);
            if filter.matches(&parsed) {
                raw.push(parsed);
            }
        }
        debug!(received = events.len(), kept = raw.len(), "Fetched relay events");
        Ok(raw)
    }
}
