use fleet_model::rack::Worker;
use fleet_model::server::Server;

/// The fire-and-forget RPC a "start" transition pushes to a rack's owning
/// worker, §4.4. Failure to reach the worker does not block the
/// transition: the server is already marked `Validating`/`Provisioning`
/// and the worker's own 30s loop (§4.5) will pick it up on its next pass
/// regardless of whether this push landed.
#[async_trait::async_trait]
pub trait WorkerDispatch: Send + Sync {
    async fn start_validate(&self, worker: &Worker, server: &Server);
    async fn start_provision(&self, worker: &Worker, server: &Server);
}
