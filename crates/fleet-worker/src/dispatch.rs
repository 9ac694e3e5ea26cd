use std::sync::Arc;

use fleet_model::ids::ServerId;
use fleet_model::rack::Worker;
use fleet_model::server::Server;
use fleet_provisioning::adapter::ProvisioningAdapter;
use fleet_statemachine::WorkerDispatch;
use fleet_switch::driver::SwitchDriver;
use sqlx::PgPool;

use crate::checks::{check_provisioned, check_validated};
use crate::registry::TaskRegistry;
use crate::validation_agent::ValidationAgentClient;

/// The worker's own implementation of [`WorkerDispatch`], used both by the
/// RPC server (`SendValidateServer`/`SendProvisionServer`, a remote
/// coordinator or a sibling worker calling in) and by `fleet-statemachine`
/// itself when a server this worker owns advances through `next` inside
/// one of its own stage-check tasks.
///
/// Unlike `fleet_rpc::WorkerClient`, which round-trips an RPC to reach a
/// possibly-remote worker, this claims [`TaskRegistry`] directly and spawns
/// the check in-process — the request never leaves the worker that already
/// holds the server. Every field is cheaply [`Clone`] (an `sqlx::PgPool` is
/// itself a handle to a pooled connection set, the rest are `Arc`s), so a
/// clone is handed to each spawned task rather than threading lifetimes
/// through `tokio::spawn`.
#[derive(Clone)]
pub struct LocalDispatch {
    pool: PgPool,
    registry: Arc<TaskRegistry>,
    adapter: Arc<dyn ProvisioningAdapter>,
    switch_driver: Arc<dyn SwitchDriver>,
    validation_agent: Arc<ValidationAgentClient>,
}

impl LocalDispatch {
    pub fn new(
        pool: PgPool,
        registry: Arc<TaskRegistry>,
        adapter: Arc<dyn ProvisioningAdapter>,
        switch_driver: Arc<dyn SwitchDriver>,
        validation_agent: Arc<ValidationAgentClient>,
    ) -> Self {
        Self {
            pool,
            registry,
            adapter,
            switch_driver,
            validation_agent,
        }
    }

    /// Claims `server_id` and spawns `check_validated`, unless a task for
    /// it is already running. Used both by [`WorkerDispatch::start_validate`]
    /// and directly by the 30s loop (§4.5 steps 2-3) when it finds a
    /// server in `Validating` with no in-process task.
    pub fn spawn_validate(&self, server_id: ServerId) {
        let Some(token) = self.registry.try_claim(server_id) else {
            tracing::debug!(server = %server_id, "validate already in-process, skipping");
            return;
        };
        let this = self.clone();
        tokio::spawn(async move {
            let result = check_validated(
                &this.pool,
                this.adapter.as_ref(),
                this.switch_driver.as_ref(),
                this.validation_agent.as_ref(),
                &this,
                token,
                server_id,
            )
            .await;
            if let Err(e) = &result {
                tracing::warn!(server = %server_id, error = %e, "check_validated ended in error");
            }
            crate::metrics::record_check_validated(&result);
            this.registry.release(server_id);
        });
    }

    /// The switch driver this worker was constructed with, shared so the
    /// worker loop's rack-level validation step (§4.7) doesn't need its
    /// own copy threaded in separately.
    pub fn switch_driver(&self) -> &Arc<dyn SwitchDriver> {
        &self.switch_driver
    }

    /// Claims `server_id` and spawns `check_provisioned`; see
    /// [`LocalDispatch::spawn_validate`].
    pub fn spawn_provision(&self, server_id: ServerId) {
        let Some(token) = self.registry.try_claim(server_id) else {
            tracing::debug!(server = %server_id, "provision already in-process, skipping");
            return;
        };
        let this = self.clone();
        tokio::spawn(async move {
            let result =
                check_provisioned(&this.pool, this.adapter.as_ref(), &this, token, server_id).await;
            if let Err(e) = &result {
                tracing::warn!(server = %server_id, error = %e, "check_provisioned ended in error");
            }
            crate::metrics::record_check_provisioned(&result);
            this.registry.release(server_id);
        });
    }
}

#[async_trait::async_trait]
impl WorkerDispatch for LocalDispatch {
    async fn start_validate(&self, _worker: &Worker, server: &Server) {
        self.spawn_validate(server.id);
    }

    async fn start_provision(&self, _worker: &Worker, server: &Server) {
        self.spawn_provision(server.id);
    }
}
