use fleet_model::FleetResult;
use fleet_model::asset::Asset;
use fleet_model::ids::{RackId, SwitchId};
use fleet_model::network::{Subnet, SwitchInterface};
use fleet_model::rack::Rack;
use fleet_model::switch::Switch;
use sqlx::PgPool;

/// The joined read §4.1 calls out: switch + asset.rack + interfaces.
#[derive(Debug, Clone)]
pub struct SwitchWithContext {
    pub switch: Switch,
    pub asset: Asset,
    pub rack: Rack,
    pub interfaces: Vec<SwitchInterface>,
}

pub async fn get_switch(pool: &PgPool, id: SwitchId) -> FleetResult<Switch> {
    sqlx::query_as::<_, Switch>("SELECT * FROM switches WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("switch {id}")))
}

pub async fn get_switch_with_context(pool: &PgPool, id: SwitchId) -> FleetResult<SwitchWithContext> {
    let switch = get_switch(pool, id).await?;

    let asset = sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
        .bind(switch.asset_id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("asset for switch {id}")))?;

    let rack = sqlx::query_as::<_, Rack>("SELECT * FROM racks WHERE id = $1")
        .bind(switch.rack_id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("rack for switch {id}")))?;

    let interfaces = sqlx::query_as::<_, SwitchInterface>(
        "SELECT * FROM switch_interfaces WHERE switch_id = $1",
    )
    .bind(id.0)
    .fetch_all(pool)
    .await?;

    Ok(SwitchWithContext {
        switch,
        asset,
        rack,
        interfaces,
    })
}

/// All switches belonging to a rack, as `switch_validate_for_rack` (§4.7)
/// needs.
pub async fn list_switches_for_rack(pool: &PgPool, rack_id: RackId) -> FleetResult<Vec<Switch>> {
    sqlx::query_as::<_, Switch>("SELECT * FROM switches WHERE rack_id = $1 ORDER BY name")
        .bind(rack_id.0)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

/// §4.3 step 6: resolves the rack owning `subnet` by finding any switch
/// interface whose network address matches the subnet's network.
pub async fn find_rack_by_subnet_network(pool: &PgPool, subnet: &Subnet) -> FleetResult<Option<Rack>> {
    sqlx::query_as::<_, Rack>(
        r#"
        SELECT r.* FROM racks r
        JOIN switches sw ON sw.rack_id = r.id
        JOIN switch_interfaces si ON si.switch_id = sw.id
        WHERE si.network_address = $1 AND r.deleted = 0
        LIMIT 1
        "#,
    )
    .bind(subnet.network.network())
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct NewSwitch {
    pub asset_id: fleet_model::ids::AssetId,
    pub rack_id: RackId,
    pub name: String,
}

pub async fn create_switch(pool: &PgPool, new: NewSwitch) -> FleetResult<Switch> {
    sqlx::query_as::<_, Switch>(
        r#"
        INSERT INTO switches (id, asset_id, rack_id, name, created_at, updated_at)
        VALUES ($1, $2, $3, $4, now(), now())
        RETURNING *
        "#,
    )
    .bind(SwitchId::new().0)
    .bind(new.asset_id.0)
    .bind(new.rack_id.0)
    .bind(&new.name)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

pub async fn set_switch_interfaces(
    pool: &PgPool,
    switch_id: SwitchId,
    interfaces: &[SwitchInterface],
) -> FleetResult<()> {
    let mut txn = pool.begin().await?;
    sqlx::query("DELETE FROM switch_interfaces WHERE switch_id = $1")
        .bind(switch_id.0)
        .execute(&mut *txn)
        .await?;
    for iface in interfaces {
        sqlx::query(
            r#"
            INSERT INTO switch_interfaces
                (id, switch_id, name, mac, ip, netmask, gateway, network_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(iface.id.0)
        .bind(switch_id.0)
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
