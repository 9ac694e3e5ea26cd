use std::str::FromStr;

use fleet_db::RackTriggerFilter;
use fleet_model::ids::{RackId, ServerId};
use fleet_model::status::{ServerStatus, TargetStatus};
use fleet_rpc::ContextExt;
use fleet_rpc::proto::coordinator_service_server::CoordinatorService;
use fleet_rpc::proto::{
    DecommissionServerRequest, Empty, GetServerRequest, GetServerResponse, ListServersRequest,
    ListServersResponse, RackTriggerRequest, RackTriggerResponse, StopServerRequest,
};
use fleet_rpc::worker_client::RoundRobinEndpoints;
use fleet_rpc::{WorkerClient, proto};
use fleet_statemachine::{TriggerOutcome, TriggerRequest};
use sqlx::PgPool;
use tonic::{Request, Response, Status};

use crate::dispatch::RemoteDispatch;
use crate::route_cache::RouteCache;

/// `CoordinatorService` server, §4.8: rack- and server-scoped commands
/// (`CallStopServer`, `CallDecommissionServer`, `CallGetServer`) resolve the
/// owning worker via [`RouteCache`] and forward the RPC; fleet-scoped
/// commands (`CallRackTrigger`, `CallListServers`) execute locally against
/// C1. Every handler enforces `Context.location` against the resource it
/// touches before acting, per the location-scoping invariant in §4.8.
pub struct CoordinatorServiceImpl {
    pool: PgPool,
    routes: RouteCache,
    dispatch: RemoteDispatch,
}

impl CoordinatorServiceImpl {
    pub fn new(pool: PgPool, routes: RouteCache, dispatch: RemoteDispatch) -> Self {
        Self { pool, routes, dispatch }
    }

    async fn worker_for_rack(&self, rack_id: RackId) -> Result<fleet_model::rack::Worker, Status> {
        let (rack, worker) = self.routes.resolve(&self.pool, rack_id).await?;
        worker.ok_or_else(|| Status::unavailable(format!("rack {} has no owning worker", rack.name)))
    }
}

fn parse_server_id(raw: &str) -> Result<ServerId, Status> {
    ServerId::from_str(raw).map_err(|e| Status::invalid_argument(format!("malformed server_id: {e}")))
}

fn parse_rack_id(raw: &str) -> Result<RackId, Status> {
    RackId::from_str(raw).map_err(|e| Status::invalid_argument(format!("malformed rack_id: {e}")))
}

fn parse_status(raw: &str) -> Result<ServerStatus, Status> {
    ServerStatus::from_str(raw).map_err(|e| Status::invalid_argument(format!("malformed status: {e}")))
}

fn parse_target(raw: &str) -> Result<TargetStatus, Status> {
    TargetStatus::from_str(raw).map_err(|e| Status::invalid_argument(format!("malformed target_status: {e}")))
}

fn to_response(server: &fleet_model::server::Server) -> GetServerResponse {
    GetServerResponse {
        server_id: server.id.to_string(),
        status: server.status.to_string(),
        target_status: server.target_status.to_string(),
        message: server.message.clone(),
    }
}

#[tonic::async_trait]
impl CoordinatorService for CoordinatorServiceImpl {
    async fn call_rack_trigger(
        &self,
        request: Request<RackTriggerRequest>,
    ) -> Result<Response<RackTriggerResponse>, Status> {
        let req = request.into_inner();
        let ctx = req
            .ctx
            .ok_or_else(|| Status::invalid_argument("missing ctx"))?;

        let rack_id = req.rack_id.as_deref().map(parse_rack_id).transpose()?;
        if let Some(rack_id) = rack_id {
            let (rack, _worker) = self.routes.resolve(&self.pool, rack_id).await?;
            ctx.require_location(&rack.location)?;
        }

        let cluster_id = match &req.cluster {
            Some(name) => Some(fleet_db::racks::get_cluster_by_name(&self.pool, &ctx.location, name).await?.id),
            None => None,
        };

        let filter = RackTriggerFilter {
            rack_id,
            cluster_name: req.cluster_name.clone(),
            status: req.status_filter.as_deref().map(parse_status).transpose()?,
            location: if rack_id.is_none() { Some(ctx.location.clone()) } else { None },
        };

        let trigger = TriggerRequest {
            set_status: req.set_status.as_deref().map(parse_status).transpose()?,
            role: req.role.clone(),
            cluster_id,
            target_status: req.target_status.as_deref().map(parse_target).transpose()?,
            hdd_type: req.hdd_type.clone(),
            os_args: req.os_args.clone(),
            initiator: ctx.user.clone(),
        };

        let outcomes = fleet_statemachine::rack_trigger(&self.pool, &self.dispatch, &filter, &trigger).await?;

        let mut triggered_server_ids = Vec::new();
        let mut ignored_server_ids = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                TriggerOutcome::Applied => triggered_server_ids.push(id.to_string()),
                TriggerOutcome::Skipped(skip) => {
                    tracing::debug!(server = %id, ?skip, "rack_trigger skipped server");
                    ignored_server_ids.push(id.to_string());
                }
            }
        }

        Ok(Response::new(RackTriggerResponse {
            triggered_server_ids,
            ignored_server_ids,
        }))
    }

    async fn call_get_server(&self, request: Request<GetServerRequest>) -> Result<Response<GetServerResponse>, Status> {
        let req = request.into_inner();
        let ctx = req
            .ctx
            .ok_or_else(|| Status::invalid_argument("missing ctx"))?;
        let server_id = parse_server_id(&req.server_id)?;

        let with_ctx = fleet_db::servers::get_server_with_context(&self.pool, server_id).await?;
        ctx.require_location(&with_ctx.rack.location)?;

        Ok(Response::new(to_response(&with_ctx.server)))
    }

    async fn call_list_servers(
        &self,
        request: Request<ListServersRequest>,
    ) -> Result<Response<ListServersResponse>, Status> {
        let req = request.into_inner();
        let ctx = req
            .ctx
            .ok_or_else(|| Status::invalid_argument("missing ctx"))?;

        let filter = fleet_db::filters::ServerFilter {
            location: Some(ctx.location.clone()),
            rack_name: req.rack_name.clone(),
            cluster_name: req.cluster_name.clone(),
            status: req.status_filter.as_deref().map(parse_status).transpose()?,
            deleted: fleet_db::filters::DeletedFilter::ExcludeDeleted,
        };

        let servers = fleet_db::servers::list_servers(&self.pool, &filter).await?;
        Ok(Response::new(ListServersResponse {
            servers: servers.iter().map(to_response).collect(),
        }))
    }

    async fn call_stop_server(&self, request: Request<StopServerRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let ctx = req
            .ctx
            .clone()
            .ok_or_else(|| Status::invalid_argument("missing ctx"))?;
        let server_id = parse_server_id(&req.server_id)?;

        let with_ctx = fleet_db::servers::get_server_with_context(&self.pool, server_id).await?;
        ctx.require_location(&with_ctx.rack.location)?;
        let worker = self.worker_for_rack(with_ctx.rack.id).await?;

        let client = WorkerClient::new(RoundRobinEndpoints::new(vec![worker.endpoint_url.clone()]));
        client
            .send_stop_server(StopServerRequest {
                ctx: Some(proto::Context::new("fleetd-coordinator", ctx.user, ctx.location)),
                server_id: req.server_id,
                force_unlock: req.force_unlock,
            })
            .await?;
        Ok(Response::new(Empty {}))
    }

    async fn call_decommission_server(
        &self,
        request: Request<DecommissionServerRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let ctx = req
            .ctx
            .clone()
            .ok_or_else(|| Status::invalid_argument("missing ctx"))?;
        let server_id = parse_server_id(&req.server_id)?;

        let with_ctx = fleet_db::servers::get_server_with_context(&self.pool, server_id).await?;
        ctx.require_location(&with_ctx.rack.location)?;
        let worker = self.worker_for_rack(with_ctx.rack.id).await?;

        let client = WorkerClient::new(RoundRobinEndpoints::new(vec![worker.endpoint_url.clone()]));
        client
            .send_decommission_server(DecommissionServerRequest {
                ctx: Some(proto::Context::new("fleetd-coordinator", ctx.user, ctx.location)),
                server_id: req.server_id,
            })
            .await?;
        Ok(Response::new(Empty {}))
    }
}
