use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn};
use tokio::runtime::Builder;

use lsr_router::{EngineConfig, NameTable, Router, StaticTopology};

#[derive(Parser)]
#[command(name = "lsr-router", about = "Runs simulated link-state routing nodes over UDP")]
struct Cli {
    /// Name table: {"config": {"A": {"host": "127.0.0.1", "port": 5001}, ...}}
    #[arg(long, default_value = "names.json")]
    names: PathBuf,

    /// Static topology: {"config": {"A": ["B", "C"], ...}}
    #[arg(long, default_value = "topo.json")]
    topo: PathBuf,

    /// Optional engine settings (JSON, every field optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nodes to run in this process; all of the name table when omitted
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Source of the sample data message
    #[arg(long)]
    from: Option<String>,

    /// Destination of the sample data message
    #[arg(long)]
    to: Option<String>,

    #[arg(long, default_value = "Hello from the demo")]
    text: String,

    #[arg(long, default_value_t = 10)]
    hop_limit: i64,

    /// How long to let announcements spread before sending
    #[arg(long, default_value_t = 3000)]
    settle_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let names = NameTable::load(&cli.names)?;
    let topology = StaticTopology::load(&cli.topo)?;
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut selected: Vec<String> = if cli.nodes.is_empty() {
        names.iter().map(|(name, _)| name.clone()).collect()
    } else {
        cli.nodes.clone()
    };
    selected.sort();
    selected.dedup();

    if selected.is_empty() {
        bail!("name table {} lists no nodes", cli.names.display());
    }

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let mut routers = Vec::with_capacity(selected.len());
        for name in &selected {
            let router = Router::bind(name, &names, &topology, config.clone()).await?;
            router.start().await;
            routers.push(router);
        }

        info!("Waiting {} ms for announcements to spread...", cli.settle_ms);
        tokio::time::sleep(Duration::from_millis(cli.settle_ms)).await;

        for router in &routers {
            info!("{} -> {}", router.name(), router.routing_table().await);
        }

        if let (Some(from), Some(to)) = (&cli.from, &cli.to) {
            match routers.iter().find(|r| r.name() == from) {
                Some(router) => {
                    info!("Sending DATA {} -> {} ...", from, to);
                    router.send_data(to, &cli.text, cli.hop_limit).await;
                }
                None => warn!("Node {} is not running in this process", from),
            }
        }

        tokio::signal::ctrl_c().await?;
        info!("Shutting down {} nodes", routers.len());
        for router in &routers {
            router.stop().await;
        }

        Ok::<(), anyhow::Error>(())
    })
}
