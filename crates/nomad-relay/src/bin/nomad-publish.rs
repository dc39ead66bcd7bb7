use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nomad_events::{Listing, Meetup, Product, Work};
use nomad_relay::{
    Error, KeysSigner, ListingService, PublishProgress, PublishResult, RelayConfig,
    SdkRelayTransport,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListingKind {
    Work,
    Product,
    Meetup,
}

#[derive(Debug, Parser)]
#[command(name = "nomad-publish", version = nomad_relay::version())]
#[command(about = "Publish a work, product or meetup listing from a JSON draft")]
struct Args {
    #[arg(long, value_enum)]
    kind: ListingKind,
    /// JSON file holding the listing fields.
    #[arg(long)]
    data: PathBuf,
    /// Relay URL, repeatable. Falls back to NOSTR_RELAYS.
    #[arg(long)]
    relay: Vec<String>,
    /// Secret key (nsec or hex). Falls back to NOSTR_SECRET_KEY.
    #[arg(long)]
    key: Option<String>,
    /// Replace the listing with this `d` tag instead of creating a new one.
    #[arg(long)]
    d_tag: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn load_config(args: &Args) -> Result<RelayConfig, Error> {
    let mut config = match RelayConfig::from_env()? {
        Some(config) => config,
        None if !args.relay.is_empty() => {
            let key = args
                .key
                .clone()
                .ok_or(Error::MissingEnv("NOSTR_SECRET_KEY"))?;
            RelayConfig::new(args.relay.clone(), key)
        }
        None => return Err(Error::MissingEnv("NOSTR_RELAYS")),
    };
    if !args.relay.is_empty() {
        config.relays = args.relay.clone();
    }
    if let Some(key) = &args.key {
        config.secret_key = key.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

async fn publish<L: Listing>(
    config: &RelayConfig,
    path: &Path,
    d_tag: Option<&str>,
) -> Result<PublishResult, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let data: L::Data = serde_json::from_slice(&bytes)?;

    let signer = Arc::new(KeysSigner::new(config.keys()?));
    let transport = Arc::new(SdkRelayTransport::from_config(config).await?);
    let service = ListingService::<L>::new(signer, transport, config.kinds.clone());

    let progress = |p: PublishProgress| {
        info!(step = ?p.step, progress = p.progress, "{}", p.message);
    };
    let result = service.create(data, &[], d_tag, Some(&progress)).await?;
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let d_tag = args.d_tag.as_deref();

    let result = match args.kind {
        ListingKind::Work => publish::<Work>(&config, &args.data, d_tag).await?,
        ListingKind::Product => publish::<Product>(&config, &args.data, d_tag).await?,
        ListingKind::Meetup => publish::<Meetup>(&config, &args.data, d_tag).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        let reason = result.error.unwrap_or_default();
        return Err(Error::Publish(reason).into());
    }
    info!(
        event_id = result.event_id.as_deref().unwrap_or_default(),
        d_tag = result.d_tag.as_deref().unwrap_or_default(),
        relays = result.published_relays.len(),
        "Published listing"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_flag_reports_crate_version() {
        let err = Args::try_parse_from(["nomad-publish", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(nomad_relay::version()));
    }
}
