//! Hamlet Node Daemon
//!
//! One binary, three roles. A `hamletd` process runs either the barrier
//! coordinator, a villager, or the centralized trade registry, selected
//! by `--role`. Villagers register themselves with the coordinator (and
//! optionally with the registry) at startup.
//!
//! # Usage
//!
//! ```bash
//! # The coordinator
//! hamletd --role coordinator --id clock --listen 127.0.0.1:7100
//!
//! # A farmer
//! hamletd --role villager --id alice --name Alice --occupation farmer \
//!     --listen 127.0.0.1:7101 --coordinator-url http://127.0.0.1:7100 \
//!     --starting-items seed=1
//!
//! # The trade registry
//! hamletd --role registry --id market --listen 127.0.0.1:7110 \
//!     --coordinator-url http://127.0.0.1:7100
//! ```

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::{Parser, ValueEnum};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hamlet_api::{coordinator_routes, registry_routes, villager_routes};
use hamlet_client::{default_http_client, CoordinatorClient, RegistryClient, VillagerClient};
use hamlet_coordinator::Coordinator;
use hamlet_node::{Villager, VillagerConfig};
use hamlet_registry::TradeRegistry;
use hamlet_types::{ItemKind, NodeId, NodeKind, Occupation, RegisterRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Coordinator,
    Villager,
    Registry,
}

/// Hamlet node daemon
#[derive(Parser, Debug)]
#[command(name = "hamletd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which node role this process runs
    #[arg(long, value_enum, env = "HAMLET_ROLE")]
    role: Role,

    /// Node id, unique across the village
    #[arg(long, env = "HAMLET_ID")]
    id: String,

    /// Human-readable display name (defaults to the id)
    #[arg(long, env = "HAMLET_NAME")]
    name: Option<String>,

    /// Villager occupation: farmer, baker, fisher, carpenter, or merchant
    #[arg(long, env = "HAMLET_OCCUPATION")]
    occupation: Option<String>,

    /// Address to bind to
    #[arg(long, env = "HAMLET_LISTEN", default_value = "127.0.0.1:7100")]
    listen: String,

    /// Base URL other nodes reach this one at (defaults to http://{listen})
    #[arg(long, env = "HAMLET_PUBLIC_URL")]
    public_url: Option<String>,

    /// Coordinator base URL; required for villagers
    #[arg(long, env = "HAMLET_COORDINATOR_URL")]
    coordinator_url: Option<String>,

    /// Trade registry base URL, for registry-mediated trading
    #[arg(long, env = "HAMLET_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Starting currency for a villager
    #[arg(long, env = "HAMLET_STARTING_CURRENCY", default_value_t = 100)]
    starting_currency: u64,

    /// Starting inventory, e.g. "seed=1,wood=2"
    #[arg(long, env = "HAMLET_STARTING_ITEMS", default_value = "")]
    starting_items: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HAMLET_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "HAMLET_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        role = ?args.role,
        id = %args.id,
        "starting hamletd"
    );

    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", args.listen));
    let http = default_http_client()?;

    let app = match args.role {
        Role::Coordinator => {
            let notifier = Arc::new(VillagerClient::new(http));
            coordinator_routes(Arc::new(Coordinator::new(notifier)))
        }
        Role::Villager => {
            let coordinator_url = args
                .coordinator_url
                .clone()
                .context("--coordinator-url is required for villagers")?;
            let occupation = args
                .occupation
                .as_deref()
                .context("--occupation is required for villagers")?;
            let occupation = Occupation::from_str(occupation)
                .map_err(|e| anyhow::anyhow!("invalid --occupation: {e}"))?;

            let config = VillagerConfig {
                id: NodeId::new(&args.id),
                display_name: args.name.clone().unwrap_or_else(|| args.id.clone()),
                occupation,
                address: public_url.clone(),
                starting_currency: args.starting_currency,
                starting_items: parse_items(&args.starting_items)?,
            };

            let registration = RegisterRequest {
                id: config.id.clone(),
                kind: NodeKind::Villager,
                address: public_url.clone(),
                display_name: Some(config.display_name.clone()),
            };
            let coordinator = Arc::new(CoordinatorClient::new(http.clone(), coordinator_url));
            coordinator
                .register(&registration)
                .await
                .context("registering with the coordinator")?;
            if let Some(registry_url) = &args.registry_url {
                RegistryClient::new(http.clone(), registry_url.clone())
                    .register(&registration)
                    .await
                    .context("registering with the trade registry")?;
            }

            let peers = Arc::new(VillagerClient::new(http));
            villager_routes(Arc::new(Villager::new(
                config,
                coordinator,
                peers.clone(),
                peers,
            )))
        }
        Role::Registry => {
            if let Some(coordinator_url) = &args.coordinator_url {
                CoordinatorClient::new(http.clone(), coordinator_url.clone())
                    .register(&RegisterRequest {
                        id: NodeId::new(&args.id),
                        kind: NodeKind::Registry,
                        address: public_url.clone(),
                        display_name: args.name.clone(),
                    })
                    .await
                    .context("registering with the coordinator")?;
            }
            let gateway = Arc::new(VillagerClient::new(http));
            registry_routes(Arc::new(TradeRegistry::new(gateway)))
        }
    };

    let app: Router = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(listen = %args.listen, public_url = %public_url, "listening");
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_logging(level: &str, format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);
    match format {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }
}

/// Parse "item=qty,item=qty" inventory flags.
fn parse_items(raw: &str) -> anyhow::Result<Vec<(ItemKind, u64)>> {
    let mut items = Vec::new();
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (item, quantity) = pair
            .split_once('=')
            .with_context(|| format!("expected item=quantity, got {pair:?}"))?;
        let quantity: u64 = quantity
            .trim()
            .parse()
            .with_context(|| format!("bad quantity in {pair:?}"))?;
        items.push((ItemKind::new(item.trim()), quantity));
    }
    Ok(items)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let items = parse_items("seed=1, wood=2").unwrap();
        assert_eq!(items, vec![(ItemKind::seed(), 1), (ItemKind::new("wood"), 2)]);
        assert!(parse_items("").unwrap().is_empty());
        assert!(parse_items("seed").is_err());
        assert!(parse_items("seed=lots").is_err());
    }
}
