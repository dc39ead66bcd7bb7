use tracing::{debug, warn};

use nomad_events::{latest_by_address, DecodeError, Page, RawEvent, RelayFilter};

use crate::transport::RelayTransport;
use crate::Error;

/// Queries relays and returns the current version of every addressable
/// record that decodes, newest first.
pub async fn fetch_current<T, F>(
    transport: &dyn RelayTransport,
    filter: &RelayFilter,
    decode: F,
) -> Result<Page<T>, Error>
where
    F: Fn(&RawEvent) -> Result<T, DecodeError>,
{
    let events = transport.query(filter).await?;
    let received = events.len();

    let mut current = latest_by_address(events);
    current.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let last_created_at = current.last().map(|event| event.created_at);
    let mut items = Vec::with_capacity(current.len());
    for event in &current {
        match decode(event) {
            Ok(item) => items.push(item),
            Err(err) => warn!(event_id = %event.id, error = %err, "Dropping event that failed to decode"),
        }
    }

    debug!(
        received,
        current = current.len(),
        decoded = items.len(),
        "Resolved relay query"
    );
    Ok(Page::new(items, filter.limit, last_created_at))
}

/// Single newest decoded record for the filter, if any.
pub async fn fetch_one<T, F>(
    transport: &dyn RelayTransport,
    filter: &RelayFilter,
    decode: F,
) -> Result<Option<T>, Error>
where
    F: Fn(&RawEvent) -> Result<T, DecodeError>,
{
    let page = fetch_current(transport, filter, decode).await?;
    Ok(page.items.into_iter().next())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use nomad_events::events::d_tag;

    use super::*;

    struct FixedRelay(Vec<RawEvent>);

    #[async_trait]
    impl RelayTransport for FixedRelay {
        fn relays(&self) -> Vec<String> {
            vec!["wss://fixed.example".into()]
        }

        async fn send_to(&self, _relay: &str, _event: &RawEvent) -> Result<(), Error> {
            Ok(())
        }

        async fn query(&self, _filter: &RelayFilter) -> Result<Vec<RawEvent>, Error> {
            Ok(self.0.clone())
        }
    }

    fn event(id: &str, d: &str, created_at: u64, content: &str) -> RawEvent {
        RawEvent {
            id: id.into(),
            pubkey: "author".into(),
            created_at,
            kind: 30023,
            tags: vec![d_tag(d)],
            content: content.into(),
            sig: String::new(),
        }
    }

    fn decode(event: &RawEvent) -> Result<String, DecodeError> {
        if event.content == "bad" {
            return Err(DecodeError::MissingTag("title"));
        }
        Ok(event.id.clone())
    }

    #[tokio::test]
    async fn test_replaced_versions_collapse_newest_first() {
        let relay = FixedRelay(vec![
            event("a1", "a", 10, "ok"),
            event("b1", "b", 20, "ok"),
            event("a2", "a", 30, "ok"),
        ]);
        let filter = RelayFilter::default().limit(2);

        let page = fetch_current(&relay, &filter, decode).await.unwrap();
        assert_eq!(page.items, vec!["a2".to_string(), "b1".to_string()]);
        assert_eq!(page.next_until, Some(20));
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_undecodable_events_are_dropped() {
        let relay = FixedRelay(vec![event("a1", "a", 10, "ok"), event("b1", "b", 20, "bad")]);

        let page = fetch_current(&relay, &RelayFilter::default(), decode)
            .await
            .unwrap();
        assert_eq!(page.items, vec!["a1".to_string()]);
        assert!(!page.has_more);

        let one = fetch_one(&relay, &RelayFilter::default(), decode).await.unwrap();
        assert_eq!(one.as_deref(), Some("a1"));
    }
}
