//! pollftpd - Entry Point
//!
//! Hosts the poll-driven FTP session on a single-threaded tokio runtime:
//! an interval ticks `poll()` and Ctrl-C ends the session cleanly.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use tokio::time::{self, MissedTickBehavior};

use pollftpd::error::ServerError;
use pollftpd::utils::logging::setup_logging;
use pollftpd::{FtpServer, LocalFileSystem, MonotonicClock, ServerConfig, TcpTransport};

/// Single-session FTP server
#[derive(Parser, Debug)]
#[command(name = "pollftpd", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory exposed as `/`
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Control connection port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(root) = cli.root {
        config.server_root = root.to_string_lossy().into_owned();
    }
    if let Some(port) = cli.port {
        config.control_port = port;
    }
    config.validate().context("invalid configuration")?;

    let fs = LocalFileSystem::new(config.server_root_path()).map_err(|source| {
        ServerError::ServerRoot {
            path: config.server_root.clone(),
            source,
        }
    })?;
    info!("Serving {}", fs.root().display());

    let transport = TcpTransport::bind(config.tcp_settings()?)
        .context("failed to start the control listener")?;
    let mut server = FtpServer::new(
        config.server_options(),
        transport,
        fs,
        MonotonicClock::new(),
    );

    info!(
        "Launching FTP server on {}:{} (passive port {})",
        config.bind_address, config.control_port, config.pasv_port
    );

    let mut ticker = time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = ticker.tick() => server.poll(),
            result = &mut interrupt => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Interrupt received, closing session");
                server.shutdown();
                break;
            }
        }
    }

    Ok(())
}
