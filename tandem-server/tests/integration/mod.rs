
use tandem_server::{RelayConfig, UnreachablePolicy};
use tracing::Level;

use crate::utils::RelayHarness;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_harness() -> RelayHarness {
    init_tracing();
    RelayHarness::new(RelayConfig::default())
}

pub fn create_notifying_harness() -> RelayHarness {
    init_tracing();
    RelayHarness::new(RelayConfig {
        unreachable: UnreachablePolicy::Notify,
        ..RelayConfig::default()
    })
}
