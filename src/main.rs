//! Socksh - SOCKS5 proxy with direct or SSH-tunneled egress
//!
//! This is the main entry point for the socksh binary.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use socksh::config::{load_config, Config};
use socksh::socks::{pipe, Client, Server};
use socksh::transport::{Dialer, DirectDialer};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Socksh - SOCKS5 proxy server and client with direct or SSH egress
#[derive(Parser, Debug)]
#[command(name = "socksh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the SOCKS5 server with direct outbound connections
    Server {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Log in to an SSH server and serve SOCKS5 through it
    #[cfg(feature = "ssh")]
    Ssh {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Open a tunnel through a proxy and pipe it to stdin/stdout
    Client {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Destination as host:port
        #[arg(short, long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    info!("Socksh v{}", socksh::VERSION);

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(wait_for_signal(shutdown_tx));

    match args.command {
        Command::Server { config } => run_server(read_config(&config)?, shutdown_rx).await,
        #[cfg(feature = "ssh")]
        Command::Ssh { config } => run_ssh(read_config(&config)?, shutdown_rx).await,
        Command::Client { config, target } => {
            run_client(read_config(&config)?, &target, shutdown_rx).await
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    info!("Configuration loaded from: {:?}", path);
    Ok(config)
}

async fn run_server(config: Config, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let dialer = Dialer::Direct(DirectDialer::from_config(&config.server));
    let mut server = Server::new(&config.server, dialer);
    server
        .start(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to listen on {}", config.server.listen_addr))?;

    let _ = shutdown_rx.recv().await;
    server.stop().await?;
    Ok(())
}

#[cfg(feature = "ssh")]
async fn run_ssh(config: Config, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    use socksh::SshTunnel;

    let ssh = config
        .ssh
        .ok_or_else(|| anyhow!("Missing [ssh] section in configuration"))?;
    let port = ssh.port;
    info!("Connecting to SSH server {} as {}", ssh.addr, ssh.user);

    let mut tunnel = SshTunnel::connect(ssh)
        .await
        .context("Failed to establish SSH session")?;
    if let Err(e) = tunnel.start(port).await {
        let _ = tunnel.close().await;
        return Err(e).context("Failed to start SOCKS5 server");
    }

    let _ = shutdown_rx.recv().await;
    tunnel.close().await?;
    Ok(())
}

async fn run_client(
    config: Config,
    target: &str,
    mut shutdown_rx: broadcast::Receiver<bool>,
) -> Result<()> {
    let client_config = config
        .client
        .ok_or_else(|| anyhow!("Missing [client] section in configuration"))?;
    let client = Client::new(client_config);

    let stream = client.dial(target).await.with_context(|| {
        format!(
            "Failed to open tunnel to {} via {}",
            target,
            client.proxy_addr()
        )
    })?;
    info!("Tunnel to {} established", target);

    // stdin EOF only half-closes the tunnel, the response is still read
    let stdio = tokio::io::join(tokio::io::stdin(), tokio::io::stdout());
    tokio::select! {
        result = pipe(stdio, stream) => {
            let stats = result.context("Tunnel failed")?;
            info!(
                sent = stats.client_to_upstream,
                received = stats.upstream_to_client,
                "Tunnel closed"
            );
        }
        _ = shutdown_rx.recv() => {}
    }
    Ok(())
}

/// Send on `shutdown_tx` once Ctrl+C or SIGTERM arrives
async fn wait_for_signal(shutdown_tx: broadcast::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down...");
                    }
                }
            }
            Err(e) => {
                warn!("Failed to setup SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On Windows, only handle Ctrl+C
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }

    let _ = shutdown_tx.send(true);
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so the client subcommand can use stdout for data
    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
