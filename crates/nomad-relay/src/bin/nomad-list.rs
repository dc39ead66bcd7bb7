use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nomad_events::{Listing, Meetup, Page, Product, Work};
use nomad_relay::config::parse_relays;
use nomad_relay::{Error, KeysSigner, ListingService, RelayConfig, SdkRelayTransport};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListingKind {
    Work,
    Product,
    Meetup,
}

#[derive(Debug, Parser)]
#[command(name = "nomad-list", version = nomad_relay::version())]
#[command(about = "List current work, product or meetup listings as JSON")]
struct Args {
    #[arg(long, value_enum, default_value = "work")]
    kind: ListingKind,
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Only listings created at or before this unix timestamp.
    #[arg(long)]
    until: Option<u64>,
    /// Hex public key of the author.
    #[arg(long)]
    author: Option<String>,
    #[arg(long, conflicts_with = "author")]
    category: Option<String>,
    /// Relay URL, repeatable. Falls back to NOSTR_RELAYS.
    #[arg(long)]
    relay: Vec<String>,
}

async fn list<L: Listing>(
    config: &RelayConfig,
    args: &Args,
) -> Result<Page<L::Event>, Error> {
    // Listing only reads; a throwaway key is enough when none is configured.
    let signer = match config.keys() {
        Ok(keys) => KeysSigner::new(keys),
        Err(_) => KeysSigner::new(nostr_sdk::Keys::generate()),
    };
    let transport = Arc::new(SdkRelayTransport::from_config(config).await?);
    let service = ListingService::<L>::new(Arc::new(signer), transport, config.kinds.clone());

    match (&args.author, &args.category) {
        (Some(author), _) => service.fetch_by_author(author, args.limit, args.until).await,
        (None, Some(category)) => {
            service
                .fetch_by_category(category, args.limit, args.until)
                .await
        }
        (None, None) => service.fetch_public(args.limit, args.until).await,
    }
}

fn print_page<T: Serialize>(page: &Page<T>) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(page)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let relays = if args.relay.is_empty() {
        std::env::var("NOSTR_RELAYS")
            .map(|value| parse_relays(&value))
            .unwrap_or_default()
    } else {
        args.relay.clone()
    };
    if relays.is_empty() {
        return Err(Error::MissingEnv("NOSTR_RELAYS").into());
    }
    let mut config = match RelayConfig::from_env() {
        Ok(Some(config)) => config,
        _ => RelayConfig::new(
            Vec::new(),
            std::env::var("NOSTR_SECRET_KEY").unwrap_or_default(),
        ),
    };
    config.relays = relays;

    let count = match args.kind {
        ListingKind::Work => {
            let page = list::<Work>(&config, &args).await?;
            print_page(&page)?;
            page.len()
        }
        ListingKind::Product => {
            let page = list::<Product>(&config, &args).await?;
            print_page(&page)?;
            page.len()
        }
        ListingKind::Meetup => {
            let page = list::<Meetup>(&config, &args).await?;
            print_page(&page)?;
            page.len()
        }
    };
    info!(count, "Listed current events");
    Ok(())
}
