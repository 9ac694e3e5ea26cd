pub mod caches;
pub mod engine;

pub use caches::{DiscoveryCaches, InFlightGuard};
pub use engine::{DiscoveryConfig, DiscoveryEngine};
