//! Device simulator binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use telemetry_queue::{redact_url, QueueClient};
use telemetry_simulator::{
    parse_duration, Generator, HttpPublisher, Publisher, PublisherMode, Runner, SimulatorConfig,
    SourceId,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "device-simulator", version)]
#[command(about = "Publishes simulated sensor readings at a fixed interval")]
struct Args {
    /// Path to a TOML configuration file (optional)
    #[arg(short, long, default_value = "simulator.toml", env = "TELEMETRY_CONFIG")]
    config: PathBuf,

    /// Where readings go (overrides config file)
    #[arg(short, long, value_enum)]
    mode: Option<PublisherMode>,

    /// Broker URI (overrides config file)
    #[arg(long, env = "RABBITMQ_URL")]
    amqp_url: Option<String>,

    /// Queue name (overrides config file)
    #[arg(long)]
    queue: Option<String>,

    /// Collector endpoint for HTTP mode (overrides config file)
    #[arg(long)]
    collector_url: Option<String>,

    /// Sensor id to report as (overrides config file)
    #[arg(short, long)]
    source_id: Option<SourceId>,

    /// Publish interval, e.g. "5s", "500ms" (overrides config file)
    #[arg(short, long, value_parser = parse_interval)]
    interval: Option<Duration>,

    /// Stop after this many readings
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Seed the generator for a reproducible sequence
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

impl Args {
    /// CLI > ENV > config file
    fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(mode) = self.mode {
            config.publisher.mode = mode;
        }
        if let Some(url) = &self.amqp_url {
            config.queue.url = url.clone();
        }
        if let Some(queue) = &self.queue {
            config.queue.queue = queue.clone();
        }
        if let Some(url) = &self.collector_url {
            config.publisher.collector_url = url.clone();
        }
        if let Some(source_id) = &self.source_id {
            config.generator.source_id = source_id.clone();
        }
        if let Some(interval) = self.interval {
            config.generator.interval = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telemetry_simulator=debug,telemetry_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Loading configuration from: {}", args.config.display());
    let mut config = SimulatorConfig::load(Some(&args.config))?;
    args.apply(&mut config);
    config.validate()?;

    let generator = match args.seed {
        Some(seed) => Generator::seeded(config.generator.clone(), seed)?,
        None => Generator::new(config.generator.clone())?,
    };

    let publisher: Box<dyn Publisher> = match config.publisher.mode {
        PublisherMode::Queue => {
            let client = QueueClient::connect(&config.queue).await.with_context(|| {
                format!(
                    "Cannot start without the message broker at {}",
                    redact_url(&config.queue.url)
                )
            })?;
            Box::new(client)
        }
        PublisherMode::Http => Box::new(HttpPublisher::new(
            config.publisher.collector_url.clone(),
            config.publisher.timeout,
        )?),
    };

    let summary = Runner::new(generator, config.generator.interval)
        .limit(args.count)
        .run(publisher.as_ref(), shutdown_signal())
        .await;

    if let Err(e) = publisher.close().await {
        warn!(error = %e, "Failed to close publisher");
    }

    info!(
        published = summary.published,
        failed = summary.failed,
        "Simulator stopped"
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
