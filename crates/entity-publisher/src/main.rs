use entity_publisher::{Client, Config, Entity, HttpTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, warn};

/// Exceptional init failure: log and exit.
fn fatal(msg: &str, error: &dyn std::fmt::Display) -> ! {
    error!(%error, "{msg}");
    std::process::exit(1);
}

fn setup_logging() {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let level = std::env::var("ENTITY_PUBLISHER_LOG_LEVEL")
        .ok()
        .and_then(|val| {
            val.parse::<LevelFilter>().ok().or_else(|| {
                eprintln!("invalid ENTITY_PUBLISHER_LOG_LEVEL: {val:?}, defaulting to WARN");
                None
            })
        })
        .unwrap_or(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(level)
        .with(tracing_microjson::JsonLayer::new(std::io::stderr).with_target(true))
        .init();
}

fn setup_rustls() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }
}

/// Publish newline-delimited JSON entities from stdin, then drain and exit.
#[tokio::main]
async fn main() {
    setup_logging();
    setup_rustls();

    let config = Config::from_env().unwrap_or_else(|e| fatal("config error", &e));
    let transport =
        HttpTransport::new(&config.http).unwrap_or_else(|e| fatal("failed to build HTTP client", &e));

    let client = Client::new(transport, config.max_merge_size);
    client
        .start()
        .unwrap_or_else(|e| fatal("failed to start publisher", &e));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let entity: Entity = match serde_json::from_str(&line) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(error = %e, "skipping malformed entity");
                continue;
            }
        };
        if let Err(e) = client.put_entity_async(entity) {
            error!(error = %e, "failed to queue entity");
            break;
        }
    }

    client.stop().await;
    let stats = client.stats();
    debug!(
        batches = stats.batches_sent,
        entities = stats.entities_sent,
        dropped = stats.async_entities_dropped,
        "publisher finished"
    );
}
