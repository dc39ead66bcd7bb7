//! Attendance answers to meetups and the attendee's RSVP history.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use nomad_events::meetup::{
    decode_meetup, decode_rsvp, deletion_draft, encode_rsvp, filter_upcoming, rsvp_d_tag,
};
use nomad_events::{MeetupEvent, NomadKinds, ParsedRsvp, RelayFilter, RsvpData, RsvpStatus};

use crate::publish::{PublishResult, RelayPublisher};
use crate::query::fetch_current;
use crate::transport::{EventSigner, RelayTransport};
use crate::Error;

/// Upper bound on RSVPs fetched per query.
const RSVP_QUERY_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRsvp {
    pub rsvp: ParsedRsvp,
    /// `None` when the meetup could not be found on any relay.
    pub meetup: Option<MeetupEvent>,
}

#[derive(Clone)]
pub struct RsvpService {
    signer: Arc<dyn EventSigner>,
    publisher: RelayPublisher,
    kinds: NomadKinds,
}

impl RsvpService {
    pub fn new(
        signer: Arc<dyn EventSigner>,
        transport: Arc<dyn RelayTransport>,
        kinds: NomadKinds,
    ) -> Self {
        Self {
            signer,
            publisher: RelayPublisher::new(transport),
            kinds,
        }
    }

    fn transport(&self) -> &dyn RelayTransport {
        self.publisher.transport().as_ref()
    }

    /// Publishes the signer's answer to `meetup`, replacing any earlier one.
    pub async fn rsvp(
        &self,
        meetup: &MeetupEvent,
        status: RsvpStatus,
        comment: Option<String>,
    ) -> Result<PublishResult, Error> {
        let data = RsvpData {
            meetup_d_tag: meetup.d_tag.clone(),
            meetup_pubkey: meetup.pubkey.clone(),
            status,
            comment,
        };
        let event = self.signer.sign(encode_rsvp(&data, &self.kinds)).await?;
        info!(
            event_id = %event.id,
            meetup = %meetup.coordinate(&self.kinds),
            status = %status,
            "Publishing RSVP"
        );
        Ok(self.publisher.publish_optimistic(&event).await)
    }

    /// Requests deletion of the signer's RSVP to `meetup`.
    pub async fn cancel_rsvp(&self, meetup: &MeetupEvent) -> Result<PublishResult, Error> {
        let author = self.signer.public_key();
        let reason = format!("RSVP cancelled for {}", meetup.name);
        let draft = deletion_draft(
            self.kinds.rsvp,
            &author,
            &rsvp_d_tag(&meetup.pubkey, &meetup.d_tag),
            &reason,
            &self.kinds,
        );
        let event = self.signer.sign(draft).await?;
        let result = self.publisher.publish(&event).await;
        let coordinate = meetup.coordinate(&self.kinds);
        if result.success {
            info!(event_id = %event.id, meetup = %coordinate, "RSVP cancelled");
        } else {
            warn!(event_id = %event.id, meetup = %coordinate, "RSVP cancellation was not accepted by any relay");
        }
        Ok(result)
    }

    /// Latest RSVP per meetup by `pubkey`, newest first, each paired with
    /// the meetup it answers.
    pub async fn fetch_my_rsvps(&self, pubkey: &str) -> Result<Vec<EnrichedRsvp>, Error> {
        let filter = RelayFilter::default()
            .kind(self.kinds.rsvp)
            .author(pubkey)
            .limit(RSVP_QUERY_LIMIT);
        let rsvps = fetch_current(self.transport(), &filter, |e| decode_rsvp(e, &self.kinds))
            .await?
            .items;
        if rsvps.is_empty() {
            return Ok(Vec::new());
        }

        let mut meetup_filter = RelayFilter::default().kind(self.kinds.meetup);
        for rsvp in &rsvps {
            if !meetup_filter.authors.contains(&rsvp.meetup_pubkey) {
                meetup_filter = meetup_filter.author(rsvp.meetup_pubkey.clone());
            }
            if !meetup_filter.identifiers.contains(&rsvp.meetup_d_tag) {
                meetup_filter = meetup_filter.identifier(rsvp.meetup_d_tag.clone());
            }
        }
        let meetups: HashMap<String, MeetupEvent> =
            fetch_current(self.transport(), &meetup_filter, |e| decode_meetup(e, &self.kinds))
                .await?
                .items
                .into_iter()
                .map(|meetup| (meetup.coordinate(&self.kinds), meetup))
                .collect();

        let enriched: Vec<EnrichedRsvp> = rsvps
            .into_iter()
            .map(|rsvp| {
                let meetup = meetups.get(&rsvp.meetup_coordinate(&self.kinds)).cloned();
                EnrichedRsvp { rsvp, meetup }
            })
            .collect();
        info!(
            rsvps = enriched.len(),
            with_meetup = enriched.iter().filter(|r| r.meetup.is_some()).count(),
            "Loaded RSVPs"
        );
        Ok(enriched)
    }

    /// Latest answer of every attendee of `meetup`.
    pub async fn fetch_attendees(&self, meetup: &MeetupEvent) -> Result<Vec<ParsedRsvp>, Error> {
        let coordinate = meetup.coordinate(&self.kinds);
        let filter = RelayFilter::default()
            .kind(self.kinds.rsvp)
            .identifier(rsvp_d_tag(&meetup.pubkey, &meetup.d_tag))
            .limit(RSVP_QUERY_LIMIT);
        let rsvps = fetch_current(self.transport(), &filter, |e| decode_rsvp(e, &self.kinds))
            .await?
            .items;
        Ok(rsvps
            .into_iter()
            .filter(|rsvp| rsvp.meetup_coordinate(&self.kinds) == coordinate)
            .collect())
    }
}

pub fn with_status(rsvps: &[EnrichedRsvp], status: RsvpStatus) -> Vec<&EnrichedRsvp> {
    rsvps.iter().filter(|r| r.rsvp.status == status).collect()
}

pub fn accepted(rsvps: &[EnrichedRsvp]) -> Vec<&EnrichedRsvp> {
    with_status(rsvps, RsvpStatus::Accepted)
}

pub fn tentative(rsvps: &[EnrichedRsvp]) -> Vec<&EnrichedRsvp> {
    with_status(rsvps, RsvpStatus::Tentative)
}

pub fn declined(rsvps: &[EnrichedRsvp]) -> Vec<&EnrichedRsvp> {
    with_status(rsvps, RsvpStatus::Declined)
}

/// Accepted meetups that have not ended by `now`, soonest first.
pub fn upcoming_meetups(rsvps: &[EnrichedRsvp], now: u64) -> Vec<MeetupEvent> {
    let meetups = accepted(rsvps)
        .into_iter()
        .filter_map(|r| r.meetup.clone())
        .collect();
    filter_upcoming(meetups, now)
}
