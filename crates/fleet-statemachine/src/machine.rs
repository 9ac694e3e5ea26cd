use fleet_db::RackTriggerFilter;
use fleet_model::FleetResult;
use fleet_model::ids::ClusterId;
use fleet_model::server::Server;
use fleet_model::status::{ServerStatus, TargetStatus};
use sqlx::PgPool;

use crate::dispatch::WorkerDispatch;

/// Result of a single `next` tick, §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Noop,
    Started,
}

/// Per-tick policy, §4.4: if already at target, clear the lock and stop;
/// otherwise dispatch by current status, starting the next stage's RPC
/// for `Unmanaged`/`Validated` and doing nothing (but unlocking) for any
/// other status — those are driven to completion by the worker loop, not
/// by `next` itself.
pub async fn next(pool: &PgPool, dispatch: &dyn WorkerDispatch, server: &mut Server) -> FleetResult<TickOutcome> {
    let expected_version = server.version;

    if server.status_index() == server.target_index() {
        server.lock_id.clear();
        server.set_message("target status ok");
        *server = fleet_db::servers::update_server(pool, server, expected_version).await?;
        return Ok(TickOutcome::Noop);
    }

    match server.status {
        ServerStatus::Unmanaged => {
            let (rack, worker) = rack_and_worker(pool, server).await?;
            server.status = ServerStatus::Validating;
            *server = fleet_db::servers::update_server(pool, server, expected_version).await?;
            if let Some(worker) = worker {
                dispatch.start_validate(&worker, server).await;
            } else {
                tracing::warn!(rack = %rack.name, server = %server.id, "rack has no owning worker, validation RPC not sent");
            }
            Ok(TickOutcome::Started)
        }
        ServerStatus::Validated => {
            let (rack, worker) = rack_and_worker(pool, server).await?;
            server.status = ServerStatus::Provisioning;
            *server = fleet_db::servers::update_server(pool, server, expected_version).await?;
            if let Some(worker) = worker {
                dispatch.start_provision(&worker, server).await;
            } else {
                tracing::warn!(rack = %rack.name, server = %server.id, "rack has no owning worker, provisioning RPC not sent");
            }
            Ok(TickOutcome::Started)
        }
        _ => {
            server.lock_id.clear();
            *server = fleet_db::servers::update_server(pool, server, expected_version).await?;
            Ok(TickOutcome::Noop)
        }
    }
}

async fn rack_and_worker(
    pool: &PgPool,
    server: &Server,
) -> FleetResult<(fleet_model::rack::Rack, Option<fleet_model::rack::Worker>)> {
    let asset = fleet_db::assets::get_asset(pool, server.asset_id).await?;
    let rack_id = asset
        .rack_id
        .ok_or_else(|| fleet_model::FleetError::InvalidData(format!("asset {} has no rack", asset.id)))?;
    let owner = fleet_db::racks::get_rack_with_owner(pool, rack_id).await?;
    Ok((owner.rack, owner.worker))
}

/// `error(message)`, §4.4: routes to the error status for the current
/// in-progress stage, always clearing the lock and truncating the
/// message to [`fleet_model::server::MESSAGE_MAX_BYTES`].
pub async fn error(pool: &PgPool, server: &mut Server, message: impl Into<String>) -> FleetResult<()> {
    let expected_version = server.version;
    server.status = match server.status {
        ServerStatus::Validating => ServerStatus::ValidatedWithErrors,
        ServerStatus::Provisioning => ServerStatus::ProvisionedWithErrors,
        _ => ServerStatus::Unknown,
    };
    server.lock_id.clear();
    server.set_message(message);
    *server = fleet_db::servers::update_server(pool, server, expected_version).await?;
    Ok(())
}

/// Fields an operator may set in a single `rack_trigger` call, §4.4.
#[derive(Debug, Clone, Default)]
pub struct TriggerRequest {
    pub set_status: Option<ServerStatus>,
    pub role: Option<String>,
    pub cluster_id: Option<ClusterId>,
    pub target_status: Option<TargetStatus>,
    pub hdd_type: Option<String>,
    pub os_args: Option<String>,
    pub initiator: String,
}

/// Why a server in the filter-matched set was skipped rather than
/// updated, §4.4 guards (a)-(e).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSkip {
    Busy,
    Protected,
    Ironicated,
    TargetLessThanCurrent,
    ProvisionedTargetNeedsClusterAndRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Applied,
    Skipped(TriggerSkip),
}

/// `rack_trigger`, §4.4: applies `req` to every server the filter
/// matches, enforcing guards (a)-(e) per server before committing, then
/// invokes `next` on each one that was actually updated.
pub async fn rack_trigger(
    pool: &PgPool,
    dispatch: &dyn WorkerDispatch,
    filter: &RackTriggerFilter,
    req: &TriggerRequest,
) -> FleetResult<Vec<(fleet_model::ids::ServerId, TriggerOutcome)>> {
    let servers = fleet_db::servers::servers_matching_trigger_filter(pool, filter).await?;
    let mut results = Vec::with_capacity(servers.len());

    for mut server in servers {
        match apply_trigger_one(pool, dispatch, &mut server, req).await? {
            TriggerOutcome::Applied => results.push((server.id, TriggerOutcome::Applied)),
            skipped => results.push((server.id, skipped)),
        }
    }

    Ok(results)
}

async fn apply_trigger_one(
    pool: &PgPool,
    dispatch: &dyn WorkerDispatch,
    server: &mut Server,
    req: &TriggerRequest,
) -> FleetResult<TriggerOutcome> {
    // Guard (a).
    if server.is_locked() {
        return Ok(TriggerOutcome::Skipped(TriggerSkip::Busy));
    }

    // Guard (b).
    let asset = fleet_db::assets::get_asset(pool, server.asset_id).await?;
    if asset.protected {
        return Ok(TriggerOutcome::Skipped(TriggerSkip::Protected));
    }

    // Guard (c).
    if server.meta.ironicated {
        return Ok(TriggerOutcome::Skipped(TriggerSkip::Ironicated));
    }

    let expected_version = server.version;
    let mut candidate = server.clone();
    if let Some(status) = req.set_status {
        candidate.status = status;
    }
    if let Some(role) = &req.role {
        candidate.role = role.clone();
    }
    if let Some(cluster_id) = req.cluster_id {
        candidate.cluster_id = Some(cluster_id);
    }
    if let Some(target) = req.target_status {
        candidate.target_status = target;
    }
    if let Some(hdd_type) = &req.hdd_type {
        candidate.hdd_type = Some(hdd_type.clone());
    }
    if let Some(os_args) = &req.os_args {
        candidate.os_args = Some(os_args.clone());
    }

    // Guard (d).
    if candidate.status_index() > candidate.target_index() {
        return Ok(TriggerOutcome::Skipped(TriggerSkip::TargetLessThanCurrent));
    }

    // Guard (e).
    if candidate.target_status >= TargetStatus::Provisioned
        && (candidate.cluster_id.is_none() || candidate.role.is_empty())
    {
        return Ok(TriggerOutcome::Skipped(TriggerSkip::ProvisionedTargetNeedsClusterAndRole));
    }

    candidate.lock_id = uuid::Uuid::new_v4().to_string();
    candidate.meta.extra.insert(
        "trigger_initiator".to_string(),
        serde_json::Value::String(req.initiator.clone()),
    );

    *server = fleet_db::servers::update_server(pool, &candidate, expected_version).await?;
    let _ = next(pool, dispatch, server).await?;
    Ok(TriggerOutcome::Applied)
}

/// `stop`, §4.4: only `Validating`/`Provisioning` are stoppable. Unwinding
/// the in-process task itself lives in the worker loop (C5); this reports
/// whether a stop request even applies to the server's current status.
pub fn is_stoppable(server: &Server) -> bool {
    server.status.is_stoppable()
}

/// Force-unlock path when no in-process task answered the cancellation
/// signal, §4.4: routes through `error` the same way a task's own
/// "stopped by user" failure would.
pub async fn force_unlock(pool: &PgPool, server: &mut Server) -> FleetResult<()> {
    error(pool, server, "stopped by user").await
}
