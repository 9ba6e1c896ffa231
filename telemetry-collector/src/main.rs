//! Collector binary: HTTP API plus queue drain over one shared store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use telemetry_collector::{Collector, CollectorConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "telemetry-collector", version)]
#[command(about = "Collects sensor telemetry over HTTP and from a durable queue")]
struct Args {
    /// Path to a TOML configuration file (optional)
    #[arg(short, long, default_value = "telemetry.toml", env = "TELEMETRY_CONFIG")]
    config: PathBuf,

    /// Address to listen on (overrides config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Broker URI (overrides config file)
    #[arg(long, env = "RABBITMQ_URL")]
    amqp_url: Option<String>,

    /// Queue name (overrides config file)
    #[arg(long)]
    queue: Option<String>,

    /// Accept direct pushes only; do not connect to the broker
    #[arg(long)]
    no_queue: bool,
}

impl Args {
    /// CLI > ENV > config file
    fn apply(&self, config: &mut CollectorConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen_addr = listen.clone();
        }
        if let Some(url) = &self.amqp_url {
            config.queue.url = url.clone();
        }
        if let Some(queue) = &self.queue {
            config.queue.queue = queue.clone();
        }
        if self.no_queue {
            config.consumer.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telemetry_collector=debug,telemetry_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Loading configuration from: {}", args.config.display());
    let mut config = CollectorConfig::load(Some(&args.config))?;
    args.apply(&mut config);
    config.validate()?;

    let collector = Collector::start(&config).await?;
    let ingestor = collector.ingestor().clone();
    let counts = collector.run(shutdown_signal()).await?;

    info!(
        stored = ingestor.store().len(),
        accepted_http = counts.accepted_http,
        accepted_queue = counts.accepted_queue,
        rejected = counts.rejected,
        "Shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
