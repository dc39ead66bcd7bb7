/// NIP-23 long-form content, shared by work and product listings.
pub const KIND_LONG_FORM: u16 = 30023;
/// NIP-52 time-based calendar event.
pub const KIND_MEETUP: u16 = 31923;
/// NIP-52 calendar event RSVP.
pub const KIND_RSVP: u16 = 31925;
/// NIP-09 event deletion request.
pub const KIND_DELETION: u16 = 5;

pub const WORK_SYSTEM_TAG: &str = "nostr-for-nomads-work";
pub const PRODUCT_SYSTEM_TAG: &str = "nostr-for-nomads-shop";
pub const MEETUP_SYSTEM_TAG: &str = "nostr-for-nomads-meetup";

/// Event kinds and system tags per domain type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NomadKinds {
    pub work: u16,
    pub product: u16,
    pub meetup: u16,
    pub rsvp: u16,
    pub deletion: u16,
    pub work_system_tag: String,
    pub product_system_tag: String,
    pub meetup_system_tag: String,
}

impl Default for NomadKinds {
    fn default() -> Self {
        Self {
            work: KIND_LONG_FORM,
            product: KIND_LONG_FORM,
            meetup: KIND_MEETUP,
            rsvp: KIND_RSVP,
            deletion: KIND_DELETION,
            work_system_tag: WORK_SYSTEM_TAG.to_string(),
            product_system_tag: PRODUCT_SYSTEM_TAG.to_string(),
            meetup_system_tag: MEETUP_SYSTEM_TAG.to_string(),
        }
    }
}
