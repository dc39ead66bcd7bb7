pub mod catalog;
pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod events;
pub mod filter;
pub mod listing;
pub mod media;
pub mod meetup;
pub mod product;
pub mod schema;
pub mod validation;
pub mod work;

pub use config::NomadKinds;
pub use dedup::{latest_by_address, newest};
pub use error::{DecodeError, Error};
pub use events::{
    coordinate, generate_d_tag, tag_value, tag_values, unix_timestamp, EventDraft, NostrTag,
    RawEvent,
};
pub use filter::{Page, RelayFilter};
pub use listing::{Listing, Meetup, Merged, Product, Work};
pub use media::{Attachment, MediaKind, MediaSet};
pub use meetup::{
    MeetupData, MeetupEvent, MeetupPatch, ParsedRsvp, RsvpData, RsvpStatus,
};
pub use product::{ProductCard, ProductData, ProductEvent, ProductPatch};
pub use validation::ValidationErrors;
pub use work::{WorkData, WorkEvent, WorkPatch};
