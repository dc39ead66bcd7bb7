mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use common::{signed_event, MemoryRelay, ScriptedRelay, ScriptedTransport};
use nomad_events::{RawEvent, RelayFilter};
use nomad_relay::{Error, RelayPublisher, RelayTransport};

fn three_relays(accept: [bool; 3]) -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport::new(vec![
        ScriptedRelay {
            name: "A",
            delay: Duration::from_millis(10),
            accept: accept[0],
        },
        ScriptedRelay {
            name: "B",
            delay: Duration::from_millis(100),
            accept: accept[1],
        },
        ScriptedRelay {
            name: "C",
            delay: Duration::from_millis(200),
            accept: accept[2],
        },
    ]))
}

#[tokio::test(start_paused = true)]
async fn optimistic_publish_returns_at_first_success() {
    let transport = three_relays([true, true, true]);
    let publisher = RelayPublisher::new(transport.clone());

    let start = Instant::now();
    let result = publisher.publish_optimistic(&signed_event("evt-1")).await;
    let elapsed = start.elapsed();

    assert!(result.success);
    assert_eq!(result.published_relays, vec!["A".to_string()]);
    assert!(result.failed_relays.is_empty());
    assert_eq!(result.event_id.as_deref(), Some("evt-1"));
    assert_eq!(result.d_tag.as_deref(), Some("work-1"));
    assert!(elapsed >= Duration::from_millis(10));
    assert!(elapsed < Duration::from_millis(100));

    // The slower relays still get the event after the caller has moved on.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let mut settled = transport.settled();
    settled.sort();
    assert_eq!(settled, vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn optimistic_publish_skips_failures_before_first_success() {
    let transport = three_relays([false, true, true]);
    let publisher = RelayPublisher::new(transport);

    let start = Instant::now();
    let result = publisher.publish_optimistic(&signed_event("evt-2")).await;

    assert!(result.success);
    assert_eq!(result.published_relays, vec!["B".to_string()]);
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn optimistic_publish_reports_every_failure() {
    let transport = three_relays([false, false, false]);
    let publisher = RelayPublisher::new(transport);

    let result = publisher.publish_optimistic(&signed_event("evt-3")).await;

    assert!(!result.success);
    assert!(result.published_relays.is_empty());
    let mut failed = result.failed_relays.clone();
    failed.sort();
    assert_eq!(failed, vec!["A", "B", "C"]);
    assert!(result.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn optimistic_publish_with_last_relay_succeeding_aggregates() {
    let transport = three_relays([false, false, true]);
    let publisher = RelayPublisher::new(transport);

    let result = publisher.publish_optimistic(&signed_event("evt-4")).await;

    assert!(result.success);
    assert_eq!(result.published_relays, vec!["C".to_string()]);
    assert_eq!(result.failed_relays.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn wait_all_publish_collects_every_relay() {
    let transport = three_relays([true, false, true]);
    let publisher = RelayPublisher::new(transport);

    let start = Instant::now();
    let result = publisher.publish(&signed_event("evt-5")).await;

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(result.success);
    let mut published = result.published_relays.clone();
    published.sort();
    assert_eq!(published, vec!["A", "C"]);
    assert_eq!(result.failed_relays, vec!["B".to_string()]);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn publish_without_relays_fails_immediately() {
    let publisher = RelayPublisher::new(Arc::new(MemoryRelay::new(&[])));

    let result = publisher.publish_optimistic(&signed_event("evt-6")).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("No relays configured"));

    let result = publisher.publish(&signed_event("evt-6")).await;
    assert!(!result.success);
}

/// One relay whose send task panics before it can report.
struct BrokenRelay {
    healthy: Vec<(&'static str, bool)>,
}

#[async_trait]
impl RelayTransport for BrokenRelay {
    fn relays(&self) -> Vec<String> {
        let mut relays: Vec<String> = self.healthy.iter().map(|(name, _)| name.to_string()).collect();
        relays.push("broken".to_string());
        relays
    }

    async fn send_to(&self, relay: &str, _event: &RawEvent) -> Result<(), Error> {
        match self.healthy.iter().find(|(name, _)| *name == relay) {
            Some((_, true)) => Ok(()),
            Some((_, false)) => Err(Error::Relay {
                relay: relay.to_string(),
                reason: "error: rejected".to_string(),
            }),
            None => panic!("relay connection state corrupted"),
        }
    }

    async fn query(&self, _filter: &RelayFilter) -> Result<Vec<RawEvent>, Error> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn wait_all_publish_counts_a_crashed_relay_task_as_failed() {
    let publisher = RelayPublisher::new(Arc::new(BrokenRelay {
        healthy: vec![("A", true)],
    }));

    let result = publisher.publish(&signed_event("evt-7")).await;

    assert!(result.success);
    assert_eq!(result.published_relays, vec!["A".to_string()]);
    assert_eq!(result.failed_relays, vec!["broken".to_string()]);
}

#[tokio::test]
async fn optimistic_publish_counts_a_crashed_relay_task_as_failed() {
    let publisher = RelayPublisher::new(Arc::new(BrokenRelay {
        healthy: vec![("A", false)],
    }));

    let result = publisher.publish_optimistic(&signed_event("evt-8")).await;

    assert!(!result.success);
    let mut failed = result.failed_relays.clone();
    failed.sort();
    assert_eq!(failed, vec!["A", "broken"]);
    assert_eq!(result.error.as_deref(), Some("all 2 relays failed"));
}
