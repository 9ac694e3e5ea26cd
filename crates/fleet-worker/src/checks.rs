use std::net::IpAddr;
use std::time::Duration;

use fleet_db::ServerWithContext;
use fleet_model::FleetResult;
use fleet_model::ids::ServerId;
use fleet_model::network::ServerInterface;
use fleet_model::server::Server;
use fleet_model::status::ServerStatus;
use fleet_provisioning::adapter::ProvisioningAdapter;
use fleet_statemachine::WorkerDispatch;
use fleet_switch::driver::SwitchDriver;
use fleet_switch::validate::{server_number_get, switch_validate_for_server};
use sqlx::PgPool;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::validation_agent::ValidationAgentClient;

const VALIDATION_PORT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// `check_validated`, §4.5: probes the provisioning back-end on the mgmt
/// interface, probes the validation agent's TCP port, runs the in-band
/// validation script, matches the observed hardware against the SKU
/// catalog and the rack's quota, validates the per-server switch wiring,
/// then advances `Validating -> Validated` and hands off to `next`.
///
/// Any [`fleet_model::FleetError::Ignore`] only refreshes `message`; every
/// other error routes through [`fleet_statemachine::error`] and ends the
/// task. A cancellation on `stop` is reported through the same path as
/// "stopped by user", per §4.5/§9.
pub async fn check_validated(
    pool: &PgPool,
    adapter: &dyn ProvisioningAdapter,
    switch_driver: &dyn SwitchDriver,
    validation_agent: &ValidationAgentClient,
    dispatch: &dyn WorkerDispatch,
    stop: CancellationToken,
    server_id: ServerId,
) -> FleetResult<()> {
    let ctx = fleet_db::servers::get_server_with_context(pool, server_id).await?;
    let outcome = tokio::select! {
        result = run_validated_checks(pool, &ctx, adapter, switch_driver, validation_agent, dispatch) => result,
        _ = stop.cancelled() => Err(fleet_model::FleetError::Conflict("stopped by user".to_string())),
    };
    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_ignore() => {
            let mut server = ctx.server;
            server.set_message(e.to_string());
            let expected_version = server.version;
            fleet_db::servers::update_server(pool, &server, expected_version).await?;
            Ok(())
        }
        Err(e) => {
            let mut server = ctx.server;
            fleet_statemachine::error(pool, &mut server, e.to_string()).await?;
            Err(e)
        }
    }
}

async fn run_validated_checks(
    pool: &PgPool,
    ctx: &ServerWithContext,
    adapter: &dyn ProvisioningAdapter,
    switch_driver: &dyn SwitchDriver,
    validation_agent: &ValidationAgentClient,
    dispatch: &dyn WorkerDispatch,
) -> FleetResult<()> {
    let mgmt_ip = ctx.asset.ipmi_ip.ok_or_else(|| {
        fleet_model::FleetError::ignore(format!("asset {} has no mgmt ip yet", ctx.asset.id))
    })?;

    let (done, message) = adapter.is_provisioned(&ctx.server, mgmt_ip).await?;
    if !done {
        return Err(fleet_model::FleetError::ignore(message));
    }

    probe_validation_port(mgmt_ip, validation_agent).await?;

    let server_dict = server_dict(ctx);
    let server_info = validation_agent.server_info(mgmt_ip, &server_dict).await?;
    let hardware = validation_agent.validation_script(mgmt_ip, &server_dict).await?;
    validation_agent.raid_configure(mgmt_ip, &server_dict).await?;

    let mut server = ctx.server.clone();

    let observed = hardware.as_observed();
    let catalog = fleet_db::skus::list_skus(pool).await?;
    let sku = fleet_model::sku::Sku::find_match(&catalog, &observed).ok_or_else(|| {
        fleet_model::FleetError::InvalidData(format!(
            "no sku in the catalog matches observed hardware cpu={} ram={} storage={}",
            observed.cpu, observed.ram, observed.storage
        ))
    })?;
    server.sku_id = Some(sku.name.clone());

    enforce_rack_sku_quota(pool, ctx, &sku.name).await?;

    let interfaces: Vec<ServerInterface> = server_info
        .interfaces
        .into_iter()
        .map(|iface| ServerInterface {
            id: fleet_model::ids::ServerInterfaceId::new(),
            name: iface.name,
            mac: iface.mac,
            ip: iface.ip,
            netmask: iface.netmask,
            gateway: iface.gateway,
            network_address: iface.network_address,
        })
        .collect();
    fleet_db::servers::set_server_interfaces(pool, server.id, &interfaces).await?;

    if let (Some(pxe_mac), Some(net_map)) = (server.pxe_mac, &ctx.network_map) {
        let switches = fleet_db::switches::list_switches_for_rack(pool, ctx.rack.id).await?;
        let (server_number, rack_unit) = server_number_get(switch_driver, &switches, net_map, pxe_mac).await?;
        server.server_number = Some(server_number as i32);
        server.rack_unit = Some(rack_unit as i32);

        for switch in &switches {
            switch_validate_for_server(switch_driver, switch, &server).await?;
        }
    }

    server.status = ServerStatus::Validated;
    let expected_version = server.version;
    let mut server = fleet_db::servers::update_server(pool, &server, expected_version).await?;
    hook_validated(&server);
    fleet_statemachine::next(pool, dispatch, &mut server).await?;
    Ok(())
}

/// `check_provisioned`, §4.5: probes the provisioning back-end on the
/// production interface; advances `Provisioning -> Provisioned` and fires
/// `next` on success, otherwise just refreshes `message`.
pub async fn check_provisioned(
    pool: &PgPool,
    adapter: &dyn ProvisioningAdapter,
    dispatch: &dyn WorkerDispatch,
    stop: CancellationToken,
    server_id: ServerId,
) -> FleetResult<()> {
    let ctx = fleet_db::servers::get_server_with_context(pool, server_id).await?;
    let outcome = tokio::select! {
        result = run_provisioned_check(pool, &ctx, adapter, dispatch) => result,
        _ = stop.cancelled() => Err(fleet_model::FleetError::Conflict("stopped by user".to_string())),
    };
    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_ignore() => {
            let mut server = ctx.server;
            server.set_message(e.to_string());
            let expected_version = server.version;
            fleet_db::servers::update_server(pool, &server, expected_version).await?;
            Ok(())
        }
        Err(e) => {
            let mut server = ctx.server;
            fleet_statemachine::error(pool, &mut server, e.to_string()).await?;
            Err(e)
        }
    }
}

async fn run_provisioned_check(
    pool: &PgPool,
    ctx: &ServerWithContext,
    adapter: &dyn ProvisioningAdapter,
    dispatch: &dyn WorkerDispatch,
) -> FleetResult<()> {
    let production_ip = ctx
        .interfaces
        .iter()
        .find_map(|iface| iface.ip)
        .ok_or_else(|| fleet_model::FleetError::ignore("no production interface ip discovered yet"))?;

    let (done, message) = adapter.is_provisioned(&ctx.server, production_ip).await?;

    let mut server = ctx.server.clone();
    if !done {
        server.set_message(message);
        let expected_version = server.version;
        fleet_db::servers::update_server(pool, &server, expected_version).await?;
        return Ok(());
    }

    server.status = ServerStatus::Provisioned;
    let expected_version = server.version;
    let mut server = fleet_db::servers::update_server(pool, &server, expected_version).await?;
    hook_provisioned(&server);
    fleet_statemachine::next(pool, dispatch, &mut server).await?;
    Ok(())
}

async fn probe_validation_port(mgmt_ip: IpAddr, validation_agent: &ValidationAgentClient) -> FleetResult<()> {
    let addr = (mgmt_ip, validation_agent.port()).into();
    tokio::time::timeout(VALIDATION_PORT_PROBE_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| fleet_model::FleetError::ignore(format!("validation agent at {mgmt_ip} not reachable yet")))?
        .map_err(|e| fleet_model::FleetError::ignore(format!("validation agent at {mgmt_ip}: {e}")))?;
    Ok(())
}

async fn enforce_rack_sku_quota(pool: &PgPool, ctx: &ServerWithContext, sku_name: &str) -> FleetResult<()> {
    if ctx.rack.sku_count_quota <= 0 {
        return Ok(());
    }
    let filter = fleet_db::RackTriggerFilter {
        rack_id: Some(ctx.rack.id),
        ..Default::default()
    };
    let siblings = fleet_db::servers::servers_matching_trigger_filter(pool, &filter).await?;
    let in_use = siblings
        .iter()
        .filter(|s| s.id != ctx.server.id && s.sku_id.as_deref() == Some(sku_name))
        .count() as i32;
    if in_use >= ctx.rack.sku_count_quota {
        return Err(fleet_model::FleetError::Conflict(format!(
            "rack {} has reached its sku quota of {} for {sku_name}",
            ctx.rack.name, ctx.rack.sku_count_quota
        )));
    }
    Ok(())
}

fn server_dict(ctx: &ServerWithContext) -> serde_json::Value {
    serde_json::json!({
        "server": ctx.server,
        "asset": ctx.asset,
    })
}

fn hook_validated(server: &Server) {
    tracing::info!(server = %server.id, "validated() hook");
}

fn hook_provisioned(server: &Server) {
    tracing::info!(server = %server.id, "provisioned() hook");
}
