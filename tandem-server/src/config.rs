use clap::ValueEnum;
use std::net::SocketAddr;
use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;

/// What to do when a connection's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the frame that did not fit and keep the connection. A dropped
    /// offer or answer is not resent, so the pair it belonged to stalls until
    /// one side starts a new exchange.
    DropNewest,
    /// Cut the slow connection.
    Disconnect,
}

/// What to do when a relay names a target with no live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnreachablePolicy {
    /// Drop the frame silently (logged only).
    Drop,
    /// Tell the sender with a `target-unreachable` frame.
    Notify,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub ice_servers: Vec<IceServerConfig>,
    pub outbound_capacity: usize,
    pub overflow: OverflowPolicy,
    pub unreachable: UnreachablePolicy,
    pub notify_malformed: bool,
    pub command_capacity: usize,
}

impl RelayConfig {
    /// Builds the ICE list from bare server URLs; an empty list falls back to
    /// the public STUN pool.
    pub fn with_ice_urls(mut self, urls: &[String]) -> Self {
        if !urls.is_empty() {
            self.ice_servers = urls.iter().cloned().map(IceServerConfig::stun).collect();
        }
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: default_ice_servers(),
            outbound_capacity: 64,
            overflow: OverflowPolicy::Disconnect,
            unreachable: UnreachablePolicy::Drop,
            notify_malformed: true,
            command_capacity: 1024,
        }
    }
}
