//! Fan-out of one signed event to every configured relay.
//!
//! Each relay send runs as its own task and reports into a completion
//! channel. [`RelayPublisher::publish`] waits for every relay;
//! [`RelayPublisher::publish_optimistic`] returns at the first accepting
//! relay and leaves a detached task to drain and log the rest.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use nomad_events::RawEvent;

use crate::transport::RelayTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    Publishing,
    Success,
    Failed(String),
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayStatus::Publishing => f.write_str("publishing"),
            RelayStatus::Success => f.write_str("success"),
            RelayStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub success: bool,
    pub event_id: Option<String>,
    pub d_tag: Option<String>,
    pub published_relays: Vec<String>,
    pub failed_relays: Vec<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    fn for_event(event: &RawEvent) -> Self {
        Self {
            event_id: Some(event.id.clone()),
            d_tag: event.d_tag().map(String::from),
            ..Default::default()
        }
    }
}

struct Tally {
    relays: Vec<String>,
    published: Vec<String>,
    failed: Vec<String>,
}

impl Tally {
    fn new(relays: Vec<String>) -> Self {
        Self {
            relays,
            published: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn total(&self) -> usize {
        self.relays.len()
    }

    fn completed(&self) -> usize {
        self.published.len() + self.failed.len()
    }

    fn record(&mut self, relay: String, status: &RelayStatus) {
        match status {
            RelayStatus::Success => self.published.push(relay),
            _ => self.failed.push(relay),
        }
    }

    /// Called once the completion channel is closed. A relay task that
    /// ended without reporting (it panicked or was aborted) counts as failed.
    fn settle(&mut self, event_id: &str) {
        let mut missing = self.relays.clone();
        for reported in self.published.iter().chain(&self.failed) {
            if let Some(pos) = missing.iter().position(|relay| relay == reported) {
                missing.remove(pos);
            }
        }
        for relay in missing {
            warn!(event_id = %event_id, relay = %relay, "Relay task ended without reporting");
            self.failed.push(relay);
        }
    }

    fn into_result(self, event: &RawEvent) -> PublishResult {
        let mut result = PublishResult::for_event(event);
        result.success = !self.published.is_empty();
        if !result.success {
            result.error = Some(format!("all {} relays failed", self.failed.len()));
        }
        result.published_relays = self.published;
        result.failed_relays = self.failed;
        result
    }
}

#[derive(Clone)]
pub struct RelayPublisher {
    transport: Arc<dyn RelayTransport>,
}

impl RelayPublisher {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn RelayTransport> {
        &self.transport
    }

    /// Publishes to every relay and waits for all of them.
    pub async fn publish(&self, event: &RawEvent) -> PublishResult {
        let Some((mut tally, mut completions)) = self.fan_out(event) else {
            return no_relays();
        };

        while let Some((relay, status)) = completions.recv().await {
            tally.record(relay, &status);
        }
        tally.settle(&event.id);

        let result = tally.into_result(event);
        log_outcome(&result);
        result
    }

    /// Returns as soon as one relay accepts the event. Remaining sends keep
    /// running; their outcome is only logged.
    pub async fn publish_optimistic(&self, event: &RawEvent) -> PublishResult {
        let Some((mut tally, mut completions)) = self.fan_out(event) else {
            return no_relays();
        };

        loop {
            let Some((relay, status)) = completions.recv().await else {
                break;
            };
            let accepted = status == RelayStatus::Success;
            tally.record(relay.clone(), &status);

            if accepted && tally.completed() < tally.total() {
                let mut result = PublishResult::for_event(event);
                result.success = true;
                result.published_relays = vec![relay];
                info!(
                    event_id = %event.id,
                    relay = %result.published_relays[0],
                    pending = tally.total() - tally.completed(),
                    "Published to first relay, continuing in background"
                );
                tokio::spawn(drain_background(event.id.clone(), tally, completions));
                return result;
            }
        }
        tally.settle(&event.id);

        let result = tally.into_result(event);
        log_outcome(&result);
        result
    }

    fn fan_out(&self, event: &RawEvent) -> Option<(Tally, mpsc::Receiver<(String, RelayStatus)>)> {
        let relays = self.transport.relays();
        if relays.is_empty() {
            return None;
        }

        let (tx, rx) = mpsc::channel(relays.len());
        let event = Arc::new(event.clone());

        for relay in relays.iter().cloned() {
            let tx = tx.clone();
            let transport = Arc::clone(&self.transport);
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                debug!(event_id = %event.id, relay = %relay, status = %RelayStatus::Publishing, "Relay publishing status");
                let status = match transport.send_to(&relay, &event).await {
                    Ok(()) => RelayStatus::Success,
                    Err(err) => RelayStatus::Failed(err.to_string()),
                };
                match &status {
                    RelayStatus::Failed(_) => {
                        warn!(event_id = %event.id, relay = %relay, status = %status, "Relay publishing status")
                    }
                    _ => info!(event_id = %event.id, relay = %relay, status = %status, "Relay publishing status"),
                }
                let _ = tx.send((relay, status)).await;
            });
        }

        Some((Tally::new(relays), rx))
    }
}

async fn drain_background(
    event_id: String,
    mut tally: Tally,
    mut completions: mpsc::Receiver<(String, RelayStatus)>,
) {
    while let Some((relay, status)) = completions.recv().await {
        tally.record(relay, &status);
    }
    tally.settle(&event_id);
    if tally.failed.is_empty() {
        info!(
            event_id = %event_id,
            published = tally.published.len(),
            failed = 0,
            "Background relay publishing completed"
        );
    } else {
        warn!(
            event_id = %event_id,
            published = tally.published.len(),
            failed = tally.failed.len(),
            failed_relays = ?tally.failed,
            "Background relay publishing completed with failures"
        );
    }
}

fn no_relays() -> PublishResult {
    warn!("No relays configured, nothing published");
    PublishResult::failure("No relays configured")
}

fn log_outcome(result: &PublishResult) {
    let event_id = result.event_id.as_deref().unwrap_or_default();
    if result.success {
        info!(
            event_id = %event_id,
            success = result.published_relays.len(),
            failed = result.failed_relays.len(),
            "Published nostr event"
        );
    } else {
        warn!(
            event_id = %event_id,
            failed = result.failed_relays.len(),
            "Failed to publish nostr event"
        );
    }
}
