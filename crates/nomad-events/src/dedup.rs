//! Reduces relay results to the current version of each replaceable event.

use std::collections::HashMap;

use tracing::debug;

use crate::events::RawEvent;

/// True when `candidate` supersedes `current`: newer `created_at`, or the
/// lexically lower id on a timestamp tie.
fn supersedes(candidate: &RawEvent, current: &RawEvent) -> bool {
    match candidate.created_at.cmp(&current.created_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.id < current.id,
    }
}

/// Keeps one event per `(kind, pubkey, d)` address. Events without a `d` tag
/// are dropped. The result does not depend on input order.
pub fn latest_by_address(events: Vec<RawEvent>) -> Vec<RawEvent> {
    let total = events.len();
    let mut current: HashMap<(u16, String, String), RawEvent> = HashMap::new();

    for event in events {
        let Some(d) = event.d_tag().map(String::from) else {
            debug!(event_id = %event.id, "Dropping event without d tag");
            continue;
        };
        let key = (event.kind, event.pubkey.clone(), d);
        let replace = current
            .get(&key)
            .map_or(true, |existing| supersedes(&event, existing));
        if replace {
            current.insert(key, event);
        }
    }

    debug!(received = total, kept = current.len(), "Resolved replaceable events");
    current.into_values().collect()
}

/// The single current event among versions of one record.
pub fn newest(events: Vec<RawEvent>) -> Option<RawEvent> {
    events
        .into_iter()
        .reduce(|best, event| if supersedes(&event, &best) { event } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::d_tag;

    fn event(id: &str, pubkey: &str, d: Option<&str>, created_at: u64) -> RawEvent {
        RawEvent {
            id: id.into(),
            pubkey: pubkey.into(),
            created_at,
            kind: 30023,
            tags: d.map(|d| vec![d_tag(d)]).unwrap_or_default(),
            content: String::new(),
            sig: String::new(),
        }
    }

    fn ids(mut events: Vec<RawEvent>) -> Vec<String> {
        events.sort_by(|a, b| a.id.cmp(&b.id));
        events.into_iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_keeps_max_created_at_regardless_of_order() {
        let versions = vec![
            event("a", "pk", Some("x"), 10),
            event("b", "pk", Some("x"), 30),
            event("c", "pk", Some("x"), 20),
        ];
        for rotation in 0..versions.len() {
            let mut input = versions.clone();
            input.rotate_left(rotation);
            assert_eq!(ids(latest_by_address(input.clone())), vec!["b"]);
            input.reverse();
            assert_eq!(ids(latest_by_address(input)), vec!["b"]);
        }
    }

    #[test]
    fn test_tie_breaks_on_lowest_id() {
        let forward = vec![event("f2", "pk", Some("x"), 10), event("a9", "pk", Some("x"), 10)];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(ids(latest_by_address(forward.clone())), vec!["a9"]);
        assert_eq!(ids(latest_by_address(backward)), vec!["a9"]);
        assert_eq!(newest(forward).map(|e| e.id), Some("a9".to_string()));
    }

    #[test]
    fn test_groups_by_author_and_drops_missing_d() {
        let events = vec![
            event("a", "alice", Some("x"), 10),
            event("b", "bob", Some("x"), 5),
            event("c", "alice", None, 99),
            event("d", "alice", Some("y"), 1),
        ];
        assert_eq!(ids(latest_by_address(events)), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_newest_of_empty_is_none() {
        assert!(newest(Vec::new()).is_none());
    }
}
