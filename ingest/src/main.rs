use anyhow::Context;
use bridge::routes::routes;
use clap::Parser;
use generator::sweep::GeneratorConfig;
use log::info;
use radarcore::bus::SampleBus;
use radarcore::NumericPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{IngestConfig, LinkSource};
use workflow::runner::Ingestor;

mod bridge;
mod generator;
mod link;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Sensor line ingestion and viewer fan-out service")]
struct Args {
    /// Load the service config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address for the HTTP/WebSocket bridge
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Read sensor lines from a character device
    #[arg(long, conflicts_with_all = ["tcp", "stdin", "synthetic"])]
    device: Option<PathBuf>,
    #[arg(long, default_value_t = 9600)]
    baud: u32,
    /// Read sensor lines from a TCP serial bridge
    #[arg(long, conflicts_with_all = ["stdin", "synthetic"])]
    tcp: Option<String>,
    /// Read sensor lines from standard input
    #[arg(long, default_value_t = false, conflicts_with = "synthetic")]
    stdin: bool,
    /// Drive viewers from the built-in sweep generator
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_distance: Option<f64>,
    /// Drop non-numeric sensor fields instead of substituting defaults
    #[arg(long, default_value_t = false)]
    reject_malformed: bool,
    /// Reopen a closed sensor link after this many seconds
    #[arg(long)]
    reconnect_secs: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut IngestConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(path) = &self.device {
            config.source = LinkSource::Device {
                path: path.clone(),
                baud_rate: self.baud,
            };
        } else if let Some(address) = &self.tcp {
            config.source = LinkSource::Tcp {
                address: address.clone(),
            };
        } else if self.stdin {
            config.source = LinkSource::Stdin;
        } else if self.synthetic {
            let mut generator = match &config.source {
                LinkSource::Synthetic(existing) => existing.clone(),
                _ => GeneratorConfig::default(),
            };
            if let Some(seed) = self.seed {
                generator.seed = seed;
            }
            config.source = LinkSource::Synthetic(generator);
        }
        if let Some(max_distance) = self.max_distance {
            config.radar.max_distance = max_distance;
        }
        if self.reject_malformed {
            config.radar.numeric_policy = NumericPolicy::Reject;
        }
        if self.reconnect_secs.is_some() {
            config.reconnect_secs = self.reconnect_secs;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        IngestConfig::load(path)?
    } else {
        IngestConfig::default()
    };
    args.apply(&mut config);
    config.validate()?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating ingest runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: IngestConfig) -> anyhow::Result<()> {
    let bus = SampleBus::with_capacity(config.subscriber_capacity);
    let ingestor = Ingestor::new(&config.radar, bus);

    let sensor = tokio::spawn(link::reader::run(
        config.source.clone(),
        config.reconnect_delay(),
        ingestor.clone(),
    ));

    let (address, server) = warp::serve(routes(ingestor))
        .try_bind_with_graceful_shutdown(config.listen, async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("awaiting Ctrl+C: {}", err);
            }
        })
        .with_context(|| format!("binding {}", config.listen))?;

    info!(
        "radar ingest listening on http://{} (viewers: ws://{}/events, source: {})",
        address,
        address,
        config.source.label()
    );
    server.await;

    sensor.abort();
    info!("radar ingest stopped");
    Ok(())
}
