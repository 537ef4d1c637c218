use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::{fs, select};
use tracing_subscriber::EnvFilter;

use rukv::config::{CliOverrides, Config, FileConfig, FsyncPolicy};
use rukv::metrics::PrometheusServer;
use rukv::server;

#[tokio::main]
pub async fn main() -> rukv::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let file_config = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path).await?;
            Some(toml::from_str::<FileConfig>(&content)?)
        }
        None => None,
    };

    let overrides = CliOverrides {
        listen: cli.listen,
        port: cli.port,
        log_level: cli.log_level,
        max_connections: cli.max_connections,
        aof_path: cli.aof_path,
        aof_fsync: cli.aof_fsync.map(|s| s.parse::<FsyncPolicy>()).transpose().map_err(|e: String| e)?,
    };

    let config = Config::resolve(file_config, overrides);

    if let Some(prom_listen) = cli.prom_listen {
        let prom = PrometheusServer::new(prom_listen);
        tokio::spawn(async move {
            if let Err(err) = prom.run().await {
                tracing::error!(%err, "prometheus server exited");
            }
        });
    }

    server::run(config, shutdown_signal()).await
}

/// Resolves once any of SIGHUP, SIGINT, SIGTERM, or SIGQUIT is received.
async fn shutdown_signal() {
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    select! {
        _ = hangup.recv() => {}
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
}

#[derive(Parser, Debug)]
#[clap(name = "rukv-server", version, author, about = "A Redis-compatible single-node key-value store")]
struct Cli {
    #[clap(long = "listen")]
    listen: Option<String>,

    #[clap(long = "port")]
    port: Option<u16>,

    #[clap(long = "log-level")]
    log_level: Option<String>,

    #[clap(long = "max-connections")]
    max_connections: Option<usize>,

    #[clap(long = "aof-path")]
    aof_path: Option<String>,

    #[clap(long = "aof-fsync")]
    aof_fsync: Option<String>,

    #[clap(long = "prom-listen")]
    prom_listen: Option<String>,

    #[clap(long = "config")]
    config: Option<String>,
}
