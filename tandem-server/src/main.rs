use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tandem_server::{OverflowPolicy, RelayConfig, UnreachablePolicy, serve};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebRTC signaling relay.
#[derive(Debug, Parser)]
#[command(name = "tandem-server", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "TANDEM_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// STUN/TURN URL handed to clients (repeatable)
    #[arg(long = "ice-server", env = "TANDEM_ICE_SERVERS", value_delimiter = ',')]
    ice_servers: Vec<String>,

    /// Outbound frames buffered per connection
    #[arg(long, env = "TANDEM_OUTBOUND_CAPACITY", default_value_t = 64)]
    outbound_capacity: usize,

    #[arg(long, env = "TANDEM_OVERFLOW", value_enum, default_value_t = OverflowPolicy::Disconnect)]
    overflow: OverflowPolicy,

    #[arg(long, env = "TANDEM_UNREACHABLE", value_enum, default_value_t = UnreachablePolicy::Drop)]
    unreachable: UnreachablePolicy,

    /// Send an `error` frame back for malformed messages
    #[arg(
        long,
        env = "TANDEM_NOTIFY_MALFORMED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    notify_malformed: bool,

    #[arg(long, env = "TANDEM_COMMAND_CAPACITY", default_value_t = 1024)]
    command_capacity: usize,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        RelayConfig {
            bind: self.bind,
            outbound_capacity: self.outbound_capacity,
            overflow: self.overflow,
            unreachable: self.unreachable,
            notify_malformed: self.notify_malformed,
            command_capacity: self.command_capacity,
            ..RelayConfig::default()
        }
        .with_ice_urls(&self.ice_servers)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    info!(
        "Starting relay on {} with {} ICE server(s)",
        config.bind,
        config.ice_servers.len()
    );

    serve(config, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C received, shutting down");
    })
    .await
    .context("signaling server failed")?;

    Ok(())
}
