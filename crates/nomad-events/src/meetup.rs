//! Meetups (NIP-52 calendar events), RSVPs and RSVP removal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::NomadKinds;
use crate::error::DecodeError;
use crate::events::{coordinate, d_tag, simple_tag, t_tag, EventDraft, NostrTag, RawEvent};
use crate::listing::{merge_field, merge_optional, Merged};
use crate::schema::TagReader;
use crate::validation::{ValidationErrors, MIN_TITLE_CHARS};
use crate::work::user_tag_list;

pub const DEFAULT_MEETUP_TYPE: &str = "other";

const HOST_MARKER: &str = "host";
const CO_HOST_MARKER: &str = "co-host";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetupData {
    pub name: String,
    pub description: String,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub timezone: Option<String>,
    /// Venue, or `virtual` for online meetups.
    pub location: String,
    pub geohash: Option<String>,
    pub virtual_link: Option<String>,
    pub image_url: Option<String>,
    pub meetup_type: String,
    pub tags: Vec<String>,
    /// Defaults to the signing author when absent.
    pub host_pubkey: Option<String>,
    pub co_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetupEvent {
    pub id: String,
    pub d_tag: String,
    pub pubkey: String,
    pub name: String,
    pub description: String,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub timezone: Option<String>,
    pub location: String,
    pub geohash: Option<String>,
    pub is_virtual: bool,
    pub virtual_link: Option<String>,
    pub image_url: Option<String>,
    pub meetup_type: String,
    pub tags: Vec<String>,
    pub host_pubkey: String,
    pub co_hosts: Vec<String>,
    pub created_at: u64,
    pub published_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<u64>,
    /// `Some(None)` (JSON `null`) removes the end time.
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<Option<u64>>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub geohash: Option<String>,
    pub virtual_link: Option<String>,
    pub meetup_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub co_hosts: Option<Vec<String>>,
}

// Tells an explicit `null` apart from a missing field.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn validate_meetup(data: &MeetupData) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    errors.require_min_chars(
        "name",
        Some(data.name.as_str()),
        MIN_TITLE_CHARS,
        "Name must be at least 3 characters",
    );
    errors.require_present("location", Some(data.location.as_str()), "Location is required");
    if data.start_time == 0 {
        errors.insert("start_time", "Start time is required");
    }
    if let Some(end) = data.end_time {
        if end < data.start_time {
            errors.insert("end_time", "End time must be after start time");
        }
    }
    errors.require_present(
        "meetup_type",
        Some(data.meetup_type.as_str()),
        "Meetup type is required",
    );

    if !errors.is_valid() {
        debug!(error_count = errors.len(), errors = %errors, "Meetup validation failed");
    }
    errors
}

pub fn encode_meetup(data: &MeetupData, d: &str, kinds: &NomadKinds) -> EventDraft {
    let mut tags = vec![
        d_tag(d),
        t_tag(&kinds.meetup_system_tag),
        simple_tag("name", data.name.trim()),
        simple_tag("start", data.start_time.to_string()),
    ];
    if let Some(end) = data.end_time {
        tags.push(simple_tag("end", end.to_string()));
    }
    if let Some(tz) = non_blank(&data.timezone) {
        tags.push(simple_tag("timezone", tz));
    }
    tags.push(simple_tag("location", data.location.trim()));
    for (key, value) in [
        ("g", &data.geohash),
        ("image", &data.image_url),
        ("virtual", &data.virtual_link),
    ] {
        if let Some(value) = non_blank(value) {
            tags.push(simple_tag(key, value));
        }
    }
    tags.push(simple_tag("meetup-type", &data.meetup_type));
    if let Some(host) = non_blank(&data.host_pubkey) {
        tags.push(person_tag(host, HOST_MARKER));
    }
    for co_host in data.co_hosts.iter().filter(|pk| !pk.is_empty()) {
        tags.push(person_tag(co_host, CO_HOST_MARKER));
    }
    tags.extend(user_tag_list(&data.tags, &kinds.meetup_system_tag));

    EventDraft::new(kinds.meetup, data.description.trim()).with_tags(tags)
}

pub fn decode_meetup(event: &RawEvent, kinds: &NomadKinds) -> Result<MeetupEvent, DecodeError> {
    let reader = TagReader::new(event);
    reader.expect_kind(kinds.meetup)?;
    reader.expect_system_tag(&kinds.meetup_system_tag)?;

    let d = reader.require("d")?;
    let name = reader.require("name")?;
    let start_time = reader.require_integer("start")?;
    let location = reader.require("location")?;

    let virtual_link = reader.optional("virtual").map(String::from);
    let people: Vec<&NostrTag> = event.tags.iter().filter(|t| t.name == "p").collect();
    let host_pubkey = people
        .iter()
        .find(|t| t.position(3) == Some(HOST_MARKER))
        .and_then(|t| t.value())
        .unwrap_or(event.pubkey.as_str())
        .to_string();
    let co_hosts = people
        .iter()
        .filter(|t| t.position(3) == Some(CO_HOST_MARKER))
        .filter_map(|t| t.value())
        .map(String::from)
        .collect();

    Ok(MeetupEvent {
        id: event.id.clone(),
        d_tag: d.to_string(),
        pubkey: event.pubkey.clone(),
        name: name.to_string(),
        description: event.content.clone(),
        start_time,
        end_time: reader.optional_integer("end"),
        timezone: reader.optional("timezone").map(String::from),
        location: location.to_string(),
        geohash: reader.optional("g").map(String::from),
        is_virtual: location.eq_ignore_ascii_case("virtual") || virtual_link.is_some(),
        virtual_link,
        image_url: reader.optional("image").map(String::from),
        meetup_type: reader
            .optional("meetup-type")
            .unwrap_or(DEFAULT_MEETUP_TYPE)
            .to_string(),
        tags: reader.user_tags(&kinds.meetup_system_tag),
        host_pubkey,
        co_hosts,
        created_at: event.created_at,
        published_at: event.created_at,
    })
}

pub fn merge_meetup(current: &MeetupData, patch: &MeetupPatch) -> Merged<MeetupData> {
    let data = MeetupData {
        name: merge_field(&current.name, &patch.name),
        description: merge_field(&current.description, &patch.description),
        start_time: patch.start_time.unwrap_or(current.start_time),
        end_time: patch.end_time.unwrap_or(current.end_time),
        timezone: merge_optional(&current.timezone, &patch.timezone),
        location: merge_field(&current.location, &patch.location),
        geohash: merge_optional(&current.geohash, &patch.geohash),
        virtual_link: merge_optional(&current.virtual_link, &patch.virtual_link),
        image_url: current.image_url.clone(),
        meetup_type: merge_field(&current.meetup_type, &patch.meetup_type),
        tags: merge_field(&current.tags, &patch.tags),
        host_pubkey: current.host_pubkey.clone(),
        co_hosts: merge_field(&current.co_hosts, &patch.co_hosts),
    };
    Merged::compare(current, data)
}

impl MeetupEvent {
    pub fn to_data(&self) -> MeetupData {
        MeetupData {
            name: self.name.clone(),
            description: self.description.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            timezone: self.timezone.clone(),
            location: self.location.clone(),
            geohash: self.geohash.clone(),
            virtual_link: self.virtual_link.clone(),
            image_url: self.image_url.clone(),
            meetup_type: self.meetup_type.clone(),
            tags: self.tags.clone(),
            host_pubkey: Some(self.host_pubkey.clone()),
            co_hosts: self.co_hosts.clone(),
        }
    }

    /// Address RSVPs point at.
    pub fn coordinate(&self, kinds: &NomadKinds) -> String {
        meetup_coordinate(kinds.meetup, &self.pubkey, &self.d_tag)
    }

    /// End time, or start time for open-ended meetups.
    pub fn ends_at(&self) -> u64 {
        self.end_time.unwrap_or(self.start_time)
    }
}

pub fn meetup_coordinate(kind: u16, pubkey: &str, d: &str) -> String {
    coordinate(kind, pubkey, d)
}

/// Meetups that have not ended yet, soonest first.
pub fn filter_upcoming(meetups: Vec<MeetupEvent>, now: u64) -> Vec<MeetupEvent> {
    let mut upcoming: Vec<MeetupEvent> = meetups.into_iter().filter(|m| m.ends_at() > now).collect();
    upcoming.sort_by_key(|m| m.start_time);
    upcoming
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Accepted,
    Declined,
    Tentative,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::Accepted => "accepted",
            RsvpStatus::Declined => "declined",
            RsvpStatus::Tentative => "tentative",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(RsvpStatus::Accepted),
            "declined" => Ok(RsvpStatus::Declined),
            "tentative" => Ok(RsvpStatus::Tentative),
            other => Err(DecodeError::InvalidValue {
                tag: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// An attendee's answer to a meetup, before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpData {
    pub meetup_d_tag: String,
    pub meetup_pubkey: String,
    pub status: RsvpStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRsvp {
    pub id: String,
    pub d_tag: String,
    /// Attendee.
    pub pubkey: String,
    pub meetup_d_tag: String,
    pub meetup_pubkey: String,
    pub status: RsvpStatus,
    pub comment: Option<String>,
    pub created_at: u64,
}

impl ParsedRsvp {
    pub fn meetup_coordinate(&self, kinds: &NomadKinds) -> String {
        meetup_coordinate(kinds.meetup, &self.meetup_pubkey, &self.meetup_d_tag)
    }
}

/// RSVP address for one meetup. Built from the host and the meetup's `d`
/// so meetups from different hosts sharing a `d` get separate answers.
pub fn rsvp_d_tag(meetup_pubkey: &str, meetup_d: &str) -> String {
    format!("rsvp-{meetup_pubkey}-{meetup_d}")
}

pub fn encode_rsvp(data: &RsvpData, kinds: &NomadKinds) -> EventDraft {
    let tags = vec![
        d_tag(&rsvp_d_tag(&data.meetup_pubkey, &data.meetup_d_tag)),
        simple_tag(
            "a",
            meetup_coordinate(kinds.meetup, &data.meetup_pubkey, &data.meetup_d_tag),
        ),
        simple_tag("status", data.status.as_str()),
        simple_tag("p", &data.meetup_pubkey),
    ];
    let content = data.comment.as_deref().map(str::trim).unwrap_or_default();
    EventDraft::new(kinds.rsvp, content).with_tags(tags)
}

pub fn decode_rsvp(event: &RawEvent, kinds: &NomadKinds) -> Result<ParsedRsvp, DecodeError> {
    let reader = TagReader::new(event);
    reader.expect_kind(kinds.rsvp)?;

    let d = reader.require("d")?;
    let address = reader.require("a")?;
    let status: RsvpStatus = reader.require("status")?.parse()?;
    let meetup_pubkey = reader.require("p")?;

    let parts: Vec<&str> = address.split(':').collect();
    let meetup_kind = kinds.meetup.to_string();
    let meetup_d_tag = match parts.as_slice() {
        [kind, _, d_value] if *kind == meetup_kind && !d_value.is_empty() => *d_value,
        _ => {
            return Err(DecodeError::InvalidValue {
                tag: "a",
                value: address.to_string(),
            })
        }
    };

    Ok(ParsedRsvp {
        id: event.id.clone(),
        d_tag: d.to_string(),
        pubkey: event.pubkey.clone(),
        meetup_d_tag: meetup_d_tag.to_string(),
        meetup_pubkey: meetup_pubkey.to_string(),
        status,
        comment: Some(event.content.clone()).filter(|c| !c.is_empty()),
        created_at: event.created_at,
    })
}

/// NIP-09 request deleting the replaceable event `<kind>:<author>:<d>`.
pub fn deletion_draft(kind: u16, author: &str, d: &str, reason: &str, kinds: &NomadKinds) -> EventDraft {
    let tags = vec![
        simple_tag("a", coordinate(kind, author, d)),
        simple_tag("k", kind.to_string()),
    ];
    EventDraft::new(kinds.deletion, reason).with_tags(tags)
}

fn person_tag(pubkey: &str, marker: &str) -> NostrTag {
    NostrTag::new(
        "p",
        vec![pubkey.to_string(), String::new(), marker.to_string()],
    )
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MeetupData {
        MeetupData {
            name: "Lisbon coworking breakfast".into(),
            description: "Coffee and laptops".into(),
            start_time: 1_800_000_000,
            end_time: Some(1_800_007_200),
            timezone: Some("Europe/Lisbon".into()),
            location: "Cafe Tati".into(),
            geohash: Some("eycs0".into()),
            meetup_type: "coworking".into(),
            tags: vec!["lisbon".into()],
            host_pubkey: Some("host".into()),
            co_hosts: vec!["cohost".into()],
            ..Default::default()
        }
    }

    fn sign(draft: EventDraft, pubkey: &str) -> RawEvent {
        RawEvent {
            id: format!("id-{pubkey}"),
            pubkey: pubkey.into(),
            created_at: 1_700_000_000,
            kind: draft.kind,
            tags: draft.tags,
            content: draft.content,
            sig: String::new(),
        }
    }

    #[test]
    fn test_meetup_round_trip() {
        let kinds = NomadKinds::default();
        let draft = encode_meetup(&sample(), "meetup-1", &kinds);
        assert!(draft
            .tags
            .contains(&NostrTag::new("p", vec!["cohost".into(), "".into(), "co-host".into()])));

        let parsed = decode_meetup(&sign(draft, "host"), &kinds).unwrap();
        assert_eq!(parsed.to_data(), sample());
        assert!(!parsed.is_virtual);
        assert_eq!(parsed.coordinate(&kinds), "31923:host:meetup-1");
    }

    #[test]
    fn test_meetup_defaults() {
        let kinds = NomadKinds::default();
        let mut data = sample();
        data.location = "Virtual".into();
        data.host_pubkey = None;
        let mut event = sign(encode_meetup(&data, "m", &kinds), "author");
        event.tags.retain(|t| t.name != "meetup-type");

        let parsed = decode_meetup(&event, &kinds).unwrap();
        assert_eq!(parsed.host_pubkey, "author");
        assert_eq!(parsed.meetup_type, "other");
        assert!(parsed.is_virtual);
    }

    #[test]
    fn test_invalid_start_rejected() {
        let kinds = NomadKinds::default();
        let mut event = sign(encode_meetup(&sample(), "m", &kinds), "host");
        for tag in event.tags.iter_mut().filter(|t| t.name == "start") {
            tag.values = vec!["tomorrow".into()];
        }
        assert_eq!(
            decode_meetup(&event, &kinds),
            Err(DecodeError::InvalidValue {
                tag: "start",
                value: "tomorrow".into()
            })
        );

        event.tags.retain(|t| t.name != "location");
        assert!(decode_meetup(&event, &kinds).is_err());
    }

    #[test]
    fn test_meetup_validation() {
        assert!(validate_meetup(&sample()).is_valid());

        let mut data = sample();
        data.end_time = Some(data.start_time - 1);
        data.name = "ab".into();
        let errors = validate_meetup(&data);
        assert!(errors.get("end_time").is_some());
        assert!(errors.get("name").is_some());

        let errors = validate_meetup(&MeetupData::default());
        assert!(errors.get("start_time").is_some());
        assert!(errors.get("location").is_some());
    }

    #[test]
    fn test_rsvp_round_trip() {
        let kinds = NomadKinds::default();
        let data = RsvpData {
            meetup_d_tag: "meetup-1".into(),
            meetup_pubkey: "host".into(),
            status: RsvpStatus::Tentative,
            comment: Some("Might be late".into()),
        };
        let draft = encode_rsvp(&data, &kinds);
        assert_eq!(draft.kind, 31925);
        assert_eq!(draft.d_tag(), Some("rsvp-host-meetup-1"));
        assert!(draft.tags.contains(&simple_tag("a", "31923:host:meetup-1")));

        let parsed = decode_rsvp(&sign(draft, "guest"), &kinds).unwrap();
        assert_eq!(parsed.status, RsvpStatus::Tentative);
        assert_eq!(parsed.meetup_d_tag, "meetup-1");
        assert_eq!(parsed.meetup_pubkey, "host");
        assert_eq!(parsed.comment.as_deref(), Some("Might be late"));
        assert_eq!(parsed.meetup_coordinate(&kinds), "31923:host:meetup-1");
    }

    #[test]
    fn test_rsvp_address_depends_on_meetup_host() {
        let kinds = NomadKinds::default();
        let answer = |host: &str| RsvpData {
            meetup_d_tag: "weekly".into(),
            meetup_pubkey: host.into(),
            status: RsvpStatus::Accepted,
            comment: None,
        };

        let lisbon = encode_rsvp(&answer("host-lisbon"), &kinds);
        let bali = encode_rsvp(&answer("host-bali"), &kinds);
        assert_ne!(lisbon.d_tag(), bali.d_tag());
        assert_eq!(lisbon.d_tag(), Some("rsvp-host-lisbon-weekly"));
    }

    #[test]
    fn test_merge_end_time() {
        let current = sample();

        let kept = merge_meetup(&current, &MeetupPatch::default());
        assert!(!kept.changed);
        assert_eq!(kept.data.end_time, Some(1_800_007_200));

        let moved = merge_meetup(
            &current,
            &MeetupPatch {
                end_time: Some(Some(1_800_010_800)),
                ..Default::default()
            },
        );
        assert_eq!(moved.data.end_time, Some(1_800_010_800));

        let cleared = merge_meetup(
            &current,
            &MeetupPatch {
                end_time: Some(None),
                ..Default::default()
            },
        );
        assert!(cleared.changed);
        assert_eq!(cleared.data.end_time, None);
    }

    #[test]
    fn test_patch_json_null_clears_end_time() {
        let missing: MeetupPatch = serde_json::from_str(r#"{"name":"Sunset walk"}"#).unwrap();
        assert_eq!(missing.end_time, None);

        let cleared: MeetupPatch = serde_json::from_str(r#"{"end_time":null}"#).unwrap();
        assert_eq!(cleared.end_time, Some(None));

        let set: MeetupPatch = serde_json::from_str(r#"{"end_time":1800003600}"#).unwrap();
        assert_eq!(set.end_time, Some(Some(1_800_003_600)));
    }

    #[test]
    fn test_rsvp_rejects_bad_address_and_status() {
        let kinds = NomadKinds::default();
        let data = RsvpData {
            meetup_d_tag: "m".into(),
            meetup_pubkey: "host".into(),
            status: RsvpStatus::Accepted,
            comment: None,
        };

        let mut event = sign(encode_rsvp(&data, &kinds), "guest");
        event.tags[1] = simple_tag("a", "30023:host:m");
        assert!(matches!(
            decode_rsvp(&event, &kinds),
            Err(DecodeError::InvalidValue { tag: "a", .. })
        ));

        let mut event = sign(encode_rsvp(&data, &kinds), "guest");
        event.tags[2] = simple_tag("status", "maybe");
        assert!(matches!(
            decode_rsvp(&event, &kinds),
            Err(DecodeError::InvalidValue { tag: "status", .. })
        ));

        let mut event = sign(encode_rsvp(&data, &kinds), "guest");
        event.tags.retain(|t| t.name != "p");
        assert_eq!(decode_rsvp(&event, &kinds), Err(DecodeError::MissingTag("p")));
    }

    #[test]
    fn test_deletion_draft() {
        let kinds = NomadKinds::default();
        let draft = deletion_draft(kinds.rsvp, "guest", "rsvp-m", "RSVP cancelled", &kinds);
        assert_eq!(draft.kind, 5);
        assert_eq!(
            draft.tags,
            vec![simple_tag("a", "31925:guest:rsvp-m"), simple_tag("k", "31925")]
        );
        assert_eq!(draft.content, "RSVP cancelled");
    }

    #[test]
    fn test_filter_upcoming() {
        let kinds = NomadKinds::default();
        let make = |d: &str, start: u64, end: Option<u64>| {
            let mut data = sample();
            data.start_time = start;
            data.end_time = end;
            decode_meetup(&sign(encode_meetup(&data, d, &kinds), "host"), &kinds).unwrap()
        };
        let meetups = vec![
            make("late", 300, None),
            make("past", 50, Some(90)),
            make("ongoing", 80, Some(200)),
        ];
        let upcoming = filter_upcoming(meetups, 100);
        let ids: Vec<&str> = upcoming.iter().map(|m| m.d_tag.as_str()).collect();
        assert_eq!(ids, vec!["ongoing", "late"]);
    }
}
