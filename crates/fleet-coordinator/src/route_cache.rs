use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_model::FleetResult;
use fleet_model::ids::RackId;
use fleet_model::rack::{Rack, Worker};
use sqlx::PgPool;
use tokio::sync::RwLock;

/// How long a resolved rack->worker route is trusted before C1 is
/// re-queried, §5 ("Coordinator-side caches of (worker-by-rack) expire
/// after 60 seconds").
const ROUTE_TTL: Duration = Duration::from_secs(60);

/// §4.8/§5 rack-scoped routing cache. A plain `Arc<RwLock<HashMap<..>>>`
/// rather than a crate like `dashmap`/`moka`, matching the rest of this
/// workspace's preference for explicit composition over a caching
/// library for something this small (§9's "replace process-wide mutable
/// caches... with explicit composition" redesign flag).
#[derive(Clone, Default)]
pub struct RouteCache {
    routes: Arc<RwLock<HashMap<RackId, (Rack, Option<Worker>, Instant)>>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `rack_id` to its owning `Rack`/`Worker`, consulting the
    /// cache first and falling back to C1 on a miss or expiry.
    pub async fn resolve(&self, pool: &PgPool, rack_id: RackId) -> FleetResult<(Rack, Option<Worker>)> {
        if let Some((rack, worker, fetched_at)) = self.routes.read().await.get(&rack_id) {
            if fetched_at.elapsed() < ROUTE_TTL {
                return Ok((rack.clone(), worker.clone()));
            }
        }

        let owner = fleet_db::racks::get_rack_with_owner(pool, rack_id).await?;
        self.routes
            .write()
            .await
            .insert(rack_id, (owner.rack.clone(), owner.worker.clone(), Instant::now()));
        Ok((owner.rack, owner.worker))
    }

    /// Drops a cached route, e.g. after a forwarded call fails, so the
    /// next request re-resolves via C1 instead of repeatedly hitting a
    /// worker endpoint that has since moved or gone stale.
    pub async fn invalidate(&self, rack_id: RackId) {
        self.routes.write().await.remove(&rack_id);
    }
}
