use fleet_db::{Allocator, DhcpReloadNotifier};
use fleet_model::FleetResult;
use fleet_model::ids::ServerId;
use fleet_model::status::AssetStatus;
use fleet_provisioning::adapter::ProvisioningAdapter;
use sqlx::PgPool;

/// §4.2/§4.6 decommission path: removes the provisioning back-end's host
/// record (`ProvisioningAdapter::server_delete`), frees every Port for the
/// server's serial except `ignored_vlans` (the ipmi vlan, kept so a
/// re-image can still reach IPMI/PXE per §4.2's "kept during re-imaging"),
/// and marks the asset Decommissioned. A "rebuild across vlans" is the
/// same call with `ignored_vlans` empty.
pub async fn decommission_server<N: DhcpReloadNotifier>(
    pool: &PgPool,
    adapter: &dyn ProvisioningAdapter,
    allocator: &Allocator<N>,
    ignored_vlans: &[i32],
    server_id: ServerId,
) -> FleetResult<()> {
    let server = fleet_db::servers::get_server(pool, server_id).await?;
    adapter.server_delete(&server).await?;

    let asset = fleet_db::assets::get_asset(pool, server.asset_id).await?;
    let rack_id = asset
        .rack_id
        .ok_or_else(|| fleet_model::FleetError::InvalidData(format!("asset {} has no rack", asset.id)))?;
    let rack = fleet_db::racks::get_rack_with_owner(pool, rack_id).await?.rack;

    allocator
        .delete_for_serial(&rack.name, &asset.serial, ignored_vlans)
        .await?;
    fleet_db::assets::set_asset_status(pool, asset.id, AssetStatus::Decommissioned).await?;
    Ok(())
}
