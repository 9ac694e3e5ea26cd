use fleet_model::FleetResult;
use fleet_model::asset::Asset;
use fleet_model::ids::{ClusterId, RackId, ServerId};
use fleet_model::network::ServerInterface;
use fleet_model::rack::{Cluster, NetworkMap, Rack};
use fleet_model::server::Server;
use fleet_model::status::{ServerStatus, TargetStatus};
use sqlx::PgPool;

use crate::filters::{DeletedFilter, ServerFilter};

/// The joined read §4.1 calls out: server + asset + rack + network-map +
/// cluster + interfaces.
#[derive(Debug, Clone)]
pub struct ServerWithContext {
    pub server: Server,
    pub asset: Asset,
    pub rack: Rack,
    pub network_map: Option<NetworkMap>,
    pub cluster: Option<Cluster>,
    pub interfaces: Vec<ServerInterface>,
}

pub async fn get_server(pool: &PgPool, id: ServerId) -> FleetResult<Server> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE id = $1 AND deleted = 0")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("server {id}")))
}

/// §4.3 step 4/9: whether a Server row already exists for the asset an
/// IPMI MAC resolved to.
pub async fn get_server_by_asset_id(
    pool: &PgPool,
    asset_id: fleet_model::ids::AssetId,
) -> FleetResult<Option<Server>> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE asset_id = $1 AND deleted = 0")
        .bind(asset_id.0)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
}

pub async fn get_server_with_context(pool: &PgPool, id: ServerId) -> FleetResult<ServerWithContext> {
    let server = get_server(pool, id).await?;

    let asset = sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
        .bind(server.asset_id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("asset for server {id}")))?;

    let rack = asset
        .rack_id
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("rack for server {id}")))?;
    let rack = sqlx::query_as::<_, Rack>("SELECT * FROM racks WHERE id = $1")
        .bind(rack.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("rack for server {id}")))?;

    let network_map = match rack.network_map_id {
        Some(map_id) => {
            sqlx::query_as::<_, NetworkMap>("SELECT * FROM network_maps WHERE id = $1")
                .bind(map_id.0)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let cluster = match server.cluster_id {
        Some(cluster_id) => {
            sqlx::query_as::<_, Cluster>("SELECT * FROM clusters WHERE id = $1")
                .bind(cluster_id.0)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let interfaces = sqlx::query_as::<_, ServerInterface>(
        "SELECT * FROM server_interfaces WHERE server_id = $1",
    )
    .bind(id.0)
    .fetch_all(pool)
    .await?;

    Ok(ServerWithContext {
        server,
        asset,
        rack,
        network_map,
        cluster,
        interfaces,
    })
}

pub async fn list_servers(pool: &PgPool, filter: &ServerFilter) -> FleetResult<Vec<Server>> {
    let status_str = filter.status.map(|s| s.to_string());
    sqlx::query_as::<_, Server>(
        r#"
        SELECT s.* FROM servers s
        JOIN assets a ON a.id = s.asset_id
        JOIN racks r ON r.id = a.rack_id
        LEFT JOIN clusters c ON c.id = s.cluster_id
        WHERE ($1::text IS NULL OR r.location = $1)
          AND ($2::text IS NULL OR r.name = $2)
          AND ($3::text IS NULL OR c.name = $3)
          AND ($4::text IS NULL OR s.status = $4)
          AND (($5 AND s.deleted = 0) OR ($6 AND s.deleted != 0) OR ($7))
        "#,
    )
    .bind(&filter.location)
    .bind(&filter.rack_name)
    .bind(&filter.cluster_name)
    .bind(status_str)
    .bind(matches!(filter.deleted, DeletedFilter::ExcludeDeleted))
    .bind(matches!(filter.deleted, DeletedFilter::OnlyDeleted))
    .bind(matches!(filter.deleted, DeletedFilter::IncludeDeleted))
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

/// Lists servers in `status`, owned (transitively, via asset→rack) by
/// `worker_id`, used by the worker loop (C5) to find Validating/
/// Provisioning servers to check.
pub async fn list_servers_for_worker_in_status(
    pool: &PgPool,
    worker_id: fleet_model::ids::WorkerId,
    status: ServerStatus,
) -> FleetResult<Vec<Server>> {
    sqlx::query_as::<_, Server>(
        r#"
        SELECT s.* FROM servers s
        JOIN assets a ON a.id = s.asset_id
        JOIN racks r ON r.id = a.rack_id
        WHERE r.worker_id = $1 AND s.status = $2 AND s.deleted = 0
        "#,
    )
    .bind(worker_id.0)
    .bind(status)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct NewServer {
    pub name: String,
    pub asset_id: fleet_model::ids::AssetId,
    pub role: String,
    pub cluster_id: Option<ClusterId>,
    pub target_status: TargetStatus,
}

pub async fn create_server(pool: &PgPool, new: NewServer) -> FleetResult<Server> {
    sqlx::query_as::<_, Server>(
        r#"
        INSERT INTO servers
            (id, name, status, target_status, role, lock_id, message, meta, version,
             cluster_id, asset_id, created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, $5, '', '', $6, 1, $7, $8, now(), now(), 0)
        RETURNING *
        "#,
    )
    .bind(ServerId::new().0)
    .bind(&new.name)
    .bind(ServerStatus::Unmanaged)
    .bind(new.target_status)
    .bind(&new.role)
    .bind(serde_json::json!({}))
    .bind(new.cluster_id.map(|id| id.0))
    .bind(new.asset_id.0)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

/// Performs an atomic `UPDATE ... WHERE id = ? AND version = ? RETURNING
/// ...`, per the REDESIGN FLAG in spec.md §9: this is the entire
/// implementation of optimistic concurrency, no read-modify-write gap.
/// Returns [`fleet_model::FleetError::VersionConflict`] if `expected_version`
/// no longer matches — the caller re-reads and retries.
pub async fn update_server(
    pool: &PgPool,
    server: &Server,
    expected_version: i64,
) -> FleetResult<Server> {
    if !server.satisfies_status_invariant() {
        return Err(fleet_model::FleetError::InvalidData(format!(
            "server {} status {:?} exceeds target {:?}",
            server.id, server.status, server.target_status
        )));
    }

    let updated = sqlx::query_as::<_, Server>(
        r#"
        UPDATE servers SET
            name = $3, status = $4, target_status = $5, pxe_mac = $6, pxe_ip = $7,
            role = $8, fqdn = $9, server_number = $10, rack_unit = $11, hdd_type = $12,
            os_args = $13, gateway_network = $14, lock_id = $15, message = $16,
            meta = $17, version = version + 1, cluster_id = $18, sku_id = $19,
            updated_at = now()
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(server.id.0)
    .bind(expected_version)
    .bind(&server.name)
    .bind(server.status)
    .bind(server.target_status)
    .bind(server.pxe_mac)
    .bind(server.pxe_ip)
    .bind(&server.role)
    .bind(&server.fqdn)
    .bind(server.server_number)
    .bind(server.rack_unit)
    .bind(&server.hdd_type)
    .bind(&server.os_args)
    .bind(server.gateway_network)
    .bind(&server.lock_id)
    .bind(&server.message)
    .bind(serde_json::to_value(&server.meta).unwrap_or_default())
    .bind(server.cluster_id.map(|id| id.0))
    .bind(&server.sku_id)
    .fetch_optional(pool)
    .await?;

    updated.ok_or_else(|| fleet_model::FleetError::VersionConflict {
        object_id: server.id.to_string(),
        expected: expected_version,
    })
}

pub async fn set_server_interfaces(
    pool: &PgPool,
    server_id: ServerId,
    interfaces: &[ServerInterface],
) -> FleetResult<()> {
    let mut txn = pool.begin().await?;
    sqlx::query("DELETE FROM server_interfaces WHERE server_id = $1")
        .bind(server_id.0)
        .execute(&mut *txn)
        .await?;
    for iface in interfaces {
        sqlx::query(
            r#"
            INSERT INTO server_interfaces
                (id, server_id, name, mac, ip, netmask, gateway, network_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(iface.id.0)
        .bind(server_id.0)
        .bind(&iface.name)
        .bind(iface.mac)
        .bind(iface.ip)
        .bind(iface.netmask)
        .bind(iface.gateway)
        .bind(iface.network_address)
        .execute(&mut *txn)
        .await?;
    }
    txn.commit().await?;
    Ok(())
}

/// Operator-scoped filter for `rack_trigger`, §4.4. `location` enforces
/// §4.8's "every read/write must filter by Context.location" for the
/// fleet-scoped case where no single `rack_id` already pins it.
#[derive(Debug, Default, Clone)]
pub struct RackTriggerFilter {
    pub rack_id: Option<RackId>,
    pub cluster_name: Option<String>,
    pub status: Option<ServerStatus>,
    pub location: Option<String>,
}

pub async fn servers_matching_trigger_filter(
    pool: &PgPool,
    filter: &RackTriggerFilter,
) -> FleetResult<Vec<Server>> {
    let status_str = filter.status.map(|s| s.to_string());
    sqlx::query_as::<_, Server>(
        r#"
        SELECT s.* FROM servers s
        JOIN assets a ON a.id = s.asset_id
        JOIN racks r ON r.id = a.rack_id
        LEFT JOIN clusters c ON c.id = s.cluster_id
        WHERE ($1::uuid IS NULL OR a.rack_id = $1)
          AND ($2::text IS NULL OR c.name = $2)
          AND ($3::text IS NULL OR s.status = $3)
          AND ($4::text IS NULL OR r.location = $4)
          AND s.deleted = 0
        "#,
    )
    .bind(filter.rack_id.map(|id| id.0))
    .bind(&filter.cluster_name)
    .bind(status_str)
    .bind(&filter.location)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}
