use fleet_model::FleetResult;
use fleet_model::ids::{ClusterId, NetworkMapId, RackId, WorkerId};
use fleet_model::rack::{Cluster, NetworkMap, Rack, Worker};
use fleet_model::status::RackStatus;
use sqlx::PgPool;

use crate::filters::{DeletedFilter, RackFilter};

/// A `Rack` joined with its owning `Worker` and `NetworkMap`, the read
/// shape §4.1 calls out explicitly.
#[derive(Debug, Clone)]
pub struct RackWithOwner {
    pub rack: Rack,
    pub worker: Option<Worker>,
    pub network_map: Option<NetworkMap>,
}

pub async fn list_racks(pool: &PgPool, filter: &RackFilter) -> FleetResult<Vec<Rack>> {
    let mut rows = sqlx::query_as::<_, Rack>(
        "SELECT * FROM racks WHERE ($1::text IS NULL OR location = $1)
         AND ($2::uuid IS NULL OR worker_id = $2)
         AND (($3 AND deleted = 0) OR ($4 AND deleted != 0) OR ($5))",
    )
    .bind(filter.location.as_deref())
    .bind(filter.worker_id.map(|id| id.0))
    .bind(matches!(filter.deleted, DeletedFilter::ExcludeDeleted))
    .bind(matches!(filter.deleted, DeletedFilter::OnlyDeleted))
    .bind(matches!(filter.deleted, DeletedFilter::IncludeDeleted))
    .fetch_all(pool)
    .await?;
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}

pub async fn racks_owned_by_worker(pool: &PgPool, worker_id: WorkerId) -> FleetResult<Vec<Rack>> {
    list_racks(
        pool,
        &RackFilter {
            worker_id: Some(worker_id),
            ..Default::default()
        },
    )
    .await
}

pub async fn get_rack_with_owner(pool: &PgPool, rack_id: RackId) -> FleetResult<RackWithOwner> {
    let rack = sqlx::query_as::<_, Rack>("SELECT * FROM racks WHERE id = $1 AND deleted = 0")
        .bind(rack_id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("rack {rack_id}")))?;

    let worker = match rack.worker_id {
        Some(worker_id) => {
            sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = $1")
                .bind(worker_id.0)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let network_map = match rack.network_map_id {
        Some(map_id) => {
            sqlx::query_as::<_, NetworkMap>("SELECT * FROM network_maps WHERE id = $1")
                .bind(map_id.0)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok(RackWithOwner {
        rack,
        worker,
        network_map,
    })
}

pub async fn get_rack_by_name(pool: &PgPool, location: &str, name: &str) -> FleetResult<Rack> {
    sqlx::query_as::<_, Rack>(
        "SELECT * FROM racks WHERE location = $1 AND name = $2 AND deleted = 0",
    )
    .bind(location)
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| fleet_model::FleetError::not_found(format!("rack {location}/{name}")))
}

/// Assigns (or clears) the owning worker for a rack. Mutable per §3; does
/// not touch the rack's lifetime.
pub async fn set_rack_worker(
    pool: &PgPool,
    rack_id: RackId,
    worker_id: Option<WorkerId>,
) -> FleetResult<()> {
    sqlx::query("UPDATE racks SET worker_id = $2, updated_at = now() WHERE id = $1")
        .bind(rack_id.0)
        .bind(worker_id.map(|id| id.0))
        .execute(pool)
        .await?;
    Ok(())
}

/// Persists the outcome of C7's rack-level switch validation, §4.7: the
/// free-form `metadata` column carries the human-readable message since
/// racks, unlike servers, have no dedicated `message` column in §3.
pub async fn update_rack_validation(
    pool: &PgPool,
    rack_id: RackId,
    status: RackStatus,
    message: &str,
) -> FleetResult<Rack> {
    sqlx::query_as::<_, Rack>(
        r#"
        UPDATE racks
        SET status = $2,
            metadata = jsonb_set(coalesce(metadata, '{}'::jsonb), '{validation_message}', to_jsonb($3::text)),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(rack_id.0)
    .bind(status)
    .bind(message)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

/// Upserts a worker by (name, location), per §3's worker registration
/// contract.
pub async fn upsert_worker(
    pool: &PgPool,
    name: &str,
    location: &str,
    endpoint_url: &str,
) -> FleetResult<Worker> {
    sqlx::query_as::<_, Worker>(
        r#"
        INSERT INTO workers (id, name, location, endpoint_url, created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, now(), now(), 0)
        ON CONFLICT (name, location) DO UPDATE
            SET endpoint_url = excluded.endpoint_url, updated_at = now(), deleted = 0
        RETURNING *
        "#,
    )
    .bind(WorkerId::new().0)
    .bind(name)
    .bind(location)
    .bind(endpoint_url)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

/// Refreshes a worker's `updated_at` as a liveness heartbeat (SPEC_FULL.md
/// §4.5 supplement) so the coordinator's 60s worker-route cache naturally
/// treats a worker that stopped heartbeating as stale.
pub async fn touch_worker(pool: &PgPool, worker_id: WorkerId) -> FleetResult<()> {
    sqlx::query("UPDATE workers SET updated_at = now() WHERE id = $1")
        .bind(worker_id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_network_map(pool: &PgPool, id: NetworkMapId) -> FleetResult<NetworkMap> {
    sqlx::query_as::<_, NetworkMap>("SELECT * FROM network_maps WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("network map {id}")))
}

/// Network maps are immutable once referenced by a rack in production
/// (§3); this is enforced here rather than relying on callers to check.
pub async fn update_network_map(
    pool: &PgPool,
    map: &NetworkMap,
    allow_if_unreferenced: bool,
) -> FleetResult<()> {
    if !allow_if_unreferenced {
        return Err(fleet_model::FleetError::conflict(
            "network map is immutable once referenced by a rack in production",
        ));
    }
    let referenced: i64 =
        sqlx::query_scalar("SELECT count(*) FROM racks WHERE network_map_id = $1 AND deleted = 0")
            .bind(map.id.0)
            .fetch_one(pool)
            .await?;
    if referenced > 0 {
        return Err(fleet_model::FleetError::conflict(format!(
            "network map {} is referenced by {referenced} rack(s)",
            map.id
        )));
    }
    sqlx::query(
        "UPDATE network_maps SET mgmt_port_map = $2, number_to_unit = $3, pxe_nic_name = $4, topology = $5, updated_at = now() WHERE id = $1",
    )
    .bind(map.id.0)
    .bind(serde_json::to_value(&map.mgmt_port_map).unwrap_or_default())
    .bind(serde_json::to_value(&map.number_to_unit).unwrap_or_default())
    .bind(&map.pxe_nic_name)
    .bind(serde_json::to_value(&map.topology).unwrap_or_default())
    .execute(pool)
    .await?;
    Ok(())
}

/// Plain lookup for `rack_trigger`'s `cluster` field (§4.4): reassigning a
/// server to an existing cluster must not silently create one, unlike
/// discovery's spare-pool enrollment which does via
/// [`get_or_create_cluster`].
pub async fn get_cluster_by_name(pool: &PgPool, location: &str, name: &str) -> FleetResult<Cluster> {
    sqlx::query_as::<_, Cluster>("SELECT * FROM clusters WHERE location = $1 AND name = $2 AND deleted = 0")
        .bind(location)
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("cluster {location}/{name}")))
}

pub async fn get_or_create_cluster(
    pool: &PgPool,
    location: &str,
    name: &str,
    cluster_type: &str,
) -> FleetResult<Cluster> {
    if let Some(existing) = sqlx::query_as::<_, Cluster>(
        "SELECT * FROM clusters WHERE location = $1 AND name = $2 AND deleted = 0",
    )
    .bind(location)
    .bind(name)
    .fetch_optional(pool)
    .await?
    {
        return Ok(existing);
    }

    sqlx::query_as::<_, Cluster>(
        r#"
        INSERT INTO clusters (id, name, location, cluster_type, created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, now(), now(), 0)
        RETURNING *
        "#,
    )
    .bind(ClusterId::new().0)
    .bind(name)
    .bind(location)
    .bind(cluster_type)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}
