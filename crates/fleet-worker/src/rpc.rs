use std::str::FromStr;
use std::sync::Arc;

use fleet_db::{Allocator, ShellDhcpReloadNotifier};
use fleet_discovery::engine::DiscoveryEngine;
use fleet_model::ids::ServerId;
use fleet_provisioning::adapter::ProvisioningAdapter;
use fleet_rpc::proto::worker_service_server::WorkerService;
use fleet_rpc::proto::{
    DecommissionServerRequest, DhcpHookRequest, Empty, ProvisionServerRequest, StopServerRequest,
    ValidateServerRequest,
};
use mac_address::MacAddress;
use sqlx::PgPool;
use tonic::{Request, Response, Status};

use crate::dispatch::LocalDispatch;
use crate::registry::TaskRegistry;

/// `WorkerService` server, §4.8: every method is fire-and-forget, acking
/// receipt rather than business completion. `SendValidateServer`/
/// `SendProvisionServer` hand straight to [`LocalDispatch`];
/// `SendStopServer` cancels the in-process task if one is running, or
/// force-unlocks the server directly when `force_unlock` is set and
/// nothing answered the cancellation. `SendDhcpHook` is fed directly by
/// C2's DHCP lease hook and runs the in-process `DiscoveryEngine` this
/// worker acquired at startup, §4.5 — `None` when `worker.discovery_disabled`.
/// `SendDecommissionServer` drives the §4.2/§4.6 decommission path.
pub struct WorkerServiceImpl {
    pool: PgPool,
    registry: Arc<TaskRegistry>,
    dispatch: LocalDispatch,
    discovery: Option<Arc<DiscoveryEngine<ShellDhcpReloadNotifier>>>,
    adapter: Arc<dyn ProvisioningAdapter>,
    allocator: Arc<Allocator<ShellDhcpReloadNotifier>>,
    ipmi_vlan: i32,
}

impl WorkerServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        registry: Arc<TaskRegistry>,
        dispatch: LocalDispatch,
        discovery: Option<Arc<DiscoveryEngine<ShellDhcpReloadNotifier>>>,
        adapter: Arc<dyn ProvisioningAdapter>,
        allocator: Arc<Allocator<ShellDhcpReloadNotifier>>,
        ipmi_vlan: i32,
    ) -> Self {
        Self {
            pool,
            registry,
            dispatch,
            discovery,
            adapter,
            allocator,
            ipmi_vlan,
        }
    }
}

fn parse_server_id(raw: &str) -> Result<ServerId, Status> {
    ServerId::from_str(raw).map_err(|e| Status::invalid_argument(format!("malformed server_id: {e}")))
}

/// §4.5: a lease hook may send the MAC as `aa:bb:cc:dd:ee:ff` or
/// `aa-bb-cc-dd-ee-ff`; normalize to colons before parsing.
fn parse_mac(raw: &str) -> Result<MacAddress, Status> {
    MacAddress::from_str(&raw.replace('-', ":"))
        .map_err(|e| Status::invalid_argument(format!("malformed ipmi_mac: {e}")))
}

#[tonic::async_trait]
impl WorkerService for WorkerServiceImpl {
    async fn send_validate_server(
        &self,
        request: Request<ValidateServerRequest>,
    ) -> Result<Response<Empty>, Status> {
        let server_id = parse_server_id(&request.into_inner().server_id)?;
        self.dispatch.spawn_validate(server_id);
        Ok(Response::new(Empty {}))
    }

    async fn send_provision_server(
        &self,
        request: Request<ProvisionServerRequest>,
    ) -> Result<Response<Empty>, Status> {
        let server_id = parse_server_id(&request.into_inner().server_id)?;
        self.dispatch.spawn_provision(server_id);
        Ok(Response::new(Empty {}))
    }

    async fn send_stop_server(&self, request: Request<StopServerRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let server_id = parse_server_id(&req.server_id)?;

        if self.registry.cancel(server_id) {
            return Ok(Response::new(Empty {}));
        }

        if req.force_unlock {
            let mut server = fleet_db::servers::get_server(&self.pool, server_id).await?;
            fleet_statemachine::force_unlock(&self.pool, &mut server).await?;
        }
        Ok(Response::new(Empty {}))
    }

    async fn send_decommission_server(
        &self,
        request: Request<DecommissionServerRequest>,
    ) -> Result<Response<Empty>, Status> {
        let server_id = parse_server_id(&request.into_inner().server_id)?;
        crate::decommission::decommission_server(
            &self.pool,
            self.adapter.as_ref(),
            self.allocator.as_ref(),
            &[self.ipmi_vlan],
            server_id,
        )
        .await?;
        Ok(Response::new(Empty {}))
    }

    async fn send_dhcp_hook(&self, request: Request<DhcpHookRequest>) -> Result<Response<Empty>, Status> {
        let Some(discovery) = self.discovery.clone() else {
            tracing::debug!("dhcp hook received but discovery is disabled on this worker");
            return Ok(Response::new(Empty {}));
        };

        let req = request.into_inner();
        let ipmi_ip = req
            .ipmi_ip
            .parse()
            .map_err(|e| Status::invalid_argument(format!("malformed ipmi_ip: {e}")))?;
        let ipmi_mac = parse_mac(&req.ipmi_mac)?;

        tokio::spawn(async move {
            if let Err(e) = discovery.dhcp_hook(ipmi_mac, ipmi_ip, req.force).await {
                tracing::warn!(%ipmi_mac, %ipmi_ip, error = %e, "dhcp_hook ended in error");
            }
        });
        Ok(Response::new(Empty {}))
    }
}
