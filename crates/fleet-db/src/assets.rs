use fleet_model::FleetResult;
use fleet_model::asset::Asset;
use fleet_model::ids::{AssetId, RackId};
use fleet_model::status::{AssetStatus, AssetType};
use mac_address::MacAddress;
use sqlx::PgPool;
use std::net::IpAddr;

pub async fn get_asset(pool: &PgPool, id: AssetId) -> FleetResult<Asset> {
    sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1 AND deleted = 0")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("asset {id}")))
}

pub async fn get_asset_by_serial(pool: &PgPool, serial: &str) -> FleetResult<Option<Asset>> {
    sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE serial = $1 AND deleted = 0")
        .bind(serial)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
}

pub async fn get_asset_by_ipmi_mac(
    pool: &PgPool,
    ipmi_mac: MacAddress,
) -> FleetResult<Option<Asset>> {
    sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE ipmi_mac = $1 AND deleted = 0")
        .bind(ipmi_mac)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub serial: String,
    pub brand: String,
    pub model: String,
    pub ipmi_mac: MacAddress,
    pub ipmi_ip: Option<IpAddr>,
    pub asset_type: AssetType,
    pub rack_id: Option<RackId>,
}

pub async fn create_asset(pool: &PgPool, new: NewAsset) -> FleetResult<Asset> {
    sqlx::query_as::<_, Asset>(
        r#"
        INSERT INTO assets
            (id, serial, brand, model, ipmi_mac, ipmi_ip, asset_type, status, protected, rack_id,
             created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, $9, now(), now(), 0)
        RETURNING *
        "#,
    )
    .bind(AssetId::new().0)
    .bind(&new.serial)
    .bind(&new.brand)
    .bind(&new.model)
    .bind(new.ipmi_mac)
    .bind(new.ipmi_ip)
    .bind(new.asset_type)
    .bind(AssetStatus::New)
    .bind(new.rack_id.map(|id| id.0))
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

/// §4.3 step 8: refreshes ip/mac/type for an existing asset discovered
/// again. Callers are responsible for the protected-asset short-circuit
/// before calling this (`Asset::revert_protected_status`).
pub async fn refresh_discovered_asset(
    pool: &PgPool,
    asset_id: AssetId,
    ipmi_mac: MacAddress,
    ipmi_ip: Option<IpAddr>,
    asset_type: AssetType,
) -> FleetResult<Asset> {
    sqlx::query_as::<_, Asset>(
        r#"
        UPDATE assets
        SET ipmi_mac = $2, ipmi_ip = $3, asset_type = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(asset_id.0)
    .bind(ipmi_mac)
    .bind(ipmi_ip)
    .bind(asset_type)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

pub async fn set_asset_status(
    pool: &PgPool,
    asset_id: AssetId,
    status: AssetStatus,
) -> FleetResult<()> {
    sqlx::query("UPDATE assets SET status = $2, updated_at = now() WHERE id = $1")
        .bind(asset_id.0)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft-delete, §4.1: sets `deleted_at` and flips `deleted` to a nonzero
/// marker so default queries (which filter `deleted = 0`) exclude the row
/// while it (and any serial-keyed history referencing it) remains. The
/// source schema used the row's own integer id as that marker; since
/// entities here are keyed by UUID, a plain 0/1 flag plays the same role
/// (see `DESIGN.md`).
pub async fn soft_delete_asset(pool: &PgPool, asset_id: AssetId) -> FleetResult<()> {
    sqlx::query("UPDATE assets SET deleted_at = now(), deleted = 1, updated_at = now() WHERE id = $1")
        .bind(asset_id.0)
        .execute(pool)
        .await?;
    Ok(())
}
