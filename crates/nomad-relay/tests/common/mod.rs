#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use nomad_events::{EventDraft, RawEvent, RelayFilter};
use nomad_relay::{
    Error, EventSigner, MediaFile, MediaUploader, RelayTransport, UploadReport, UploadedFile,
};

pub const BASE_TIME: u64 = 1_700_000_000;

pub fn pubkey(seed: u8) -> String {
    hex::encode([seed; 32])
}

/// Deterministic signer. Each signature advances `created_at` by one second
/// so replacements always sort after what they replace.
pub struct TestSigner {
    pubkey: String,
    clock: AtomicU64,
}

impl TestSigner {
    pub fn new(seed: u8) -> Self {
        Self {
            pubkey: pubkey(seed),
            clock: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl EventSigner for TestSigner {
    fn public_key(&self) -> String {
        self.pubkey.clone()
    }

    async fn sign(&self, draft: EventDraft) -> Result<RawEvent, Error> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        let created_at = draft.created_at.unwrap_or(BASE_TIME + tick);
        let digest = Sha256::digest(
            format!("{}:{}:{}:{}", self.pubkey, draft.kind, tick, draft.content).as_bytes(),
        );
        Ok(RawEvent {
            id: hex::encode(digest),
            pubkey: self.pubkey.clone(),
            created_at,
            kind: draft.kind,
            tags: draft.tags,
            content: draft.content,
            sig: "00".repeat(64),
        })
    }
}

/// Relays sharing one in-memory event store. Like most relays it keeps
/// every version it receives; replacement happens on read.
pub struct MemoryRelay {
    relays: Vec<String>,
    rejecting: Vec<String>,
    events: Mutex<Vec<RawEvent>>,
    sends: Mutex<HashMap<String, usize>>,
}

impl MemoryRelay {
    pub fn new(relays: &[&str]) -> Self {
        Self {
            relays: relays.iter().map(|r| r.to_string()).collect(),
            rejecting: Vec::new(),
            events: Mutex::new(Vec::new()),
            sends: Mutex::new(HashMap::new()),
        }
    }

    pub fn rejecting(mut self, relays: &[&str]) -> Self {
        self.rejecting = relays.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn insert(&self, event: RawEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<RawEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_of_kind(&self, kind: u16) -> Vec<RawEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RelayTransport for MemoryRelay {
    fn relays(&self) -> Vec<String> {
        self.relays.clone()
    }

    async fn send_to(&self, relay: &str, event: &RawEvent) -> Result<(), Error> {
        *self
            .sends
            .lock()
            .unwrap()
            .entry(relay.to_string())
            .or_default() += 1;
        if self.rejecting.iter().any(|r| r == relay) {
            return Err(Error::Relay {
                relay: relay.to_string(),
                reason: "blocked: test relay".to_string(),
            });
        }
        let mut events = self.events.lock().unwrap();
        if !events.iter().any(|e| e.id == event.id) {
            events.push(event.clone());
        }
        Ok(())
    }

    async fn query(&self, filter: &RelayFilter) -> Result<Vec<RawEvent>, Error> {
        let mut matched: Vec<RawEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

/// Relay whose sends settle after a fixed delay with a fixed outcome.
pub struct ScriptedRelay {
    pub name: &'static str,
    pub delay: Duration,
    pub accept: bool,
}

pub struct ScriptedTransport {
    script: Vec<ScriptedRelay>,
    settled: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<ScriptedRelay>) -> Self {
        Self {
            script,
            settled: Mutex::new(Vec::new()),
        }
    }

    pub fn settled(&self) -> Vec<String> {
        self.settled.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayTransport for ScriptedTransport {
    fn relays(&self) -> Vec<String> {
        self.script.iter().map(|r| r.name.to_string()).collect()
    }

    async fn send_to(&self, relay: &str, _event: &RawEvent) -> Result<(), Error> {
        let entry = self
            .script
            .iter()
            .find(|r| r.name == relay)
            .ok_or_else(|| Error::Relay {
                relay: relay.to_string(),
                reason: "unknown relay".to_string(),
            })?;
        tokio::time::sleep(entry.delay).await;
        self.settled.lock().unwrap().push(relay.to_string());
        if entry.accept {
            Ok(())
        } else {
            Err(Error::Relay {
                relay: relay.to_string(),
                reason: "error: rejected".to_string(),
            })
        }
    }

    async fn query(&self, _filter: &RelayFilter) -> Result<Vec<RawEvent>, Error> {
        Ok(Vec::new())
    }
}

/// Uploads everything to `https://media.example/<name>`.
pub struct TestUploader;

#[async_trait]
impl MediaUploader for TestUploader {
    async fn upload(&self, files: &[MediaFile]) -> Result<UploadReport, Error> {
        Ok(UploadReport {
            uploaded: files
                .iter()
                .map(|f| UploadedFile {
                    name: f.name.clone(),
                    url: format!("https://media.example/{}", f.name),
                    mime_type: f.mime_type.clone(),
                    hash: None,
                    size: None,
                })
                .collect(),
            ..Default::default()
        })
    }
}

pub fn signed_event(id: &str) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        pubkey: pubkey(1),
        created_at: BASE_TIME,
        kind: 30023,
        tags: vec![nomad_events::events::d_tag("work-1")],
        content: String::new(),
        sig: "00".repeat(64),
    }
}
