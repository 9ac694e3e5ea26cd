use fleet_model::rack::Worker;
use fleet_model::server::Server;
use fleet_rpc::proto::{Context, ProvisionServerRequest, ValidateServerRequest};
use fleet_rpc::worker_client::RoundRobinEndpoints;
use fleet_rpc::WorkerClient;
use fleet_statemachine::WorkerDispatch;

/// The coordinator's [`WorkerDispatch`] implementation, the remote
/// counterpart to `fleet-worker::dispatch::LocalDispatch`: `next` (§4.4)
/// calls this when a `rack_trigger` transition fires `start_validate`/
/// `start_provision`, and this pushes the fire-and-forget RPC across the
/// wire to whichever worker the already-resolved `Worker` row names,
/// rather than claiming a local `TaskRegistry` slot.
pub struct RemoteDispatch {
    user: String,
}

impl RemoteDispatch {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    fn client_for(&self, worker: &Worker) -> WorkerClient<RoundRobinEndpoints> {
        WorkerClient::new(RoundRobinEndpoints::new(vec![worker.endpoint_url.clone()]))
    }

    fn ctx(&self, location: &str) -> Context {
        Context::new("fleetd-coordinator", self.user.clone(), location)
    }
}

#[async_trait::async_trait]
impl WorkerDispatch for RemoteDispatch {
    async fn start_validate(&self, worker: &Worker, server: &Server) {
        let client = self.client_for(worker);
        let req = ValidateServerRequest {
            ctx: Some(self.ctx(&worker.location)),
            server_id: server.id.to_string(),
            lock_id: server.lock_id.clone(),
        };
        if let Err(e) = client.send_validate_server(req).await {
            tracing::warn!(worker = %worker.name, server = %server.id, error = %e, "send_validate_server failed");
        }
    }

    async fn start_provision(&self, worker: &Worker, server: &Server) {
        let client = self.client_for(worker);
        let req = ProvisionServerRequest {
            ctx: Some(self.ctx(&worker.location)),
            server_id: server.id.to_string(),
            lock_id: server.lock_id.clone(),
        };
        if let Err(e) = client.send_provision_server(req).await {
            tracing::warn!(worker = %worker.name, server = %server.id, error = %e, "send_provision_server failed");
        }
    }
}
