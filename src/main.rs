use std::{
    net::{IpAddr, SocketAddr},
    process::ExitCode,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use slotd::{
    config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CLIENTS, DEFAULT_PORT},
    AcceptErrorPolicy, Reactor, ServerConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "slotd", version, about = "Single-threaded TCP server with a fixed client table")]
struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of client slots (also the listen backlog)
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Upper bound on bytes read per receive
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Longest single readiness wait, in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_timeout_ms: u64,

    /// Exit with an error on the first failed accept instead of logging it
    #[arg(long)]
    fatal_accept_errors: bool,
}

impl Cli {
    fn config(&self) -> ServerConfig {
        let policy = if self.fatal_accept_errors {
            AcceptErrorPolicy::Fatal
        } else {
            AcceptErrorPolicy::LogAndContinue
        };
        ServerConfig::builder()
            .address(SocketAddr::new(self.bind, self.port))
            .max_clients(self.max_clients)
            .buffer_size(self.buffer_size)
            .poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .accept_error_policy(policy)
            .build()
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "slotd=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match serve(cli.config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address;
    let mut reactor =
        Reactor::bind(config).with_context(|| format!("failed to start server on {address}"))?;
    reactor
        .install_signals()
        .context("failed to install signal handlers")?;

    let report = reactor.run().context("server loop failed")?;
    tracing::info!(reason = ?report.reason, "Shut down cleanly");
    Ok(())
}
