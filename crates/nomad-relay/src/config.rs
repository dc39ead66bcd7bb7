use std::env;
use std::time::Duration;

use nostr_sdk::prelude::*;

use nomad_events::NomadKinds;

use crate::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct RelayConfig {
    pub relays: Vec<String>,
    pub secret_key: String,
    pub timeout: Duration,
    pub kinds: NomadKinds,
}

impl RelayConfig {
    pub fn new(relays: Vec<String>, secret_key: impl Into<String>) -> Self {
        Self {
            relays,
            secret_key: secret_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            kinds: NomadKinds::default(),
        }
    }

    /// Reads relay settings from the environment. Returns `Ok(None)` when no
    /// relays are configured.
    pub fn from_env() -> Result<Option<Self>, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Option<Self>, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relays = lookup("NOSTR_RELAYS")
            .map(|value| parse_relays(&value))
            .unwrap_or_default();
        if relays.is_empty() {
            return Ok(None);
        }

        let secret_key = lookup("NOSTR_SECRET_KEY").ok_or(Error::MissingEnv("NOSTR_SECRET_KEY"))?;
        let mut config = Self::new(relays, secret_key);

        if let Some(secs) = parse_optional::<u64>(&lookup, "NOSTR_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(kind) = parse_optional::<u16>(&lookup, "NOMAD_MEETUP_KIND")? {
            config.kinds.meetup = kind;
        }
        if let Some(kind) = parse_optional::<u16>(&lookup, "NOMAD_RSVP_KIND")? {
            config.kinds.rsvp = kind;
        }
        if let Some(tag) = lookup("NOMAD_MEETUP_SYSTEM_TAG").filter(|v| !v.trim().is_empty()) {
            config.kinds.meetup_system_tag = tag.trim().to_string();
        }

        Ok(Some(config))
    }

    pub fn keys(&self) -> Result<Keys, Error> {
        Ok(Keys::parse(&self.secret_key)?)
    }
}

fn parse_optional<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, Error> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig { key, value }),
        None => Ok(None),
    }
}

pub fn parse_relays(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}
