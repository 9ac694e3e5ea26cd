use std::net::IpAddr;
use std::sync::Arc;

use fleet_db::{Allocator, DhcpReloadNotifier};
use fleet_ipmi::{BmcVendor, IpmiCreds, SnmpDiscovery};
use fleet_model::FleetResult;
use fleet_model::ids::{AssetId, WorkerId};
use fleet_model::network::ServerInterface;
use fleet_model::rack::{Rack, SPARE_POOL_CLUSTER_NAME};
use fleet_model::server::Server;
use fleet_model::status::{AssetStatus, AssetType, TargetStatus};
use fleet_switch::{SwitchDriver, server_number_get};
use mac_address::MacAddress;
use sqlx::PgPool;

use crate::caches::{DiscoveryCaches, InFlightGuard};

/// Everything `dhcp_hook` needs that isn't already reachable from the
/// database: this worker's identity, the auto-enroll policy flag, and the
/// IPMI credentials used to probe a newly seen BMC, §4.3.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub worker_id: WorkerId,
    pub location: String,
    pub auto_enroll: bool,
    pub ipmi_user: String,
    pub ipmi_password: String,
}

/// C3. Owns the in-memory caches and the collaborators `dhcp_hook` (§4.3)
/// and `finalize` (end of S1) call into: C2's allocator, an SNMP vendor
/// prober, and C7's switch driver for `server_number_get`.
pub struct DiscoveryEngine<N: DhcpReloadNotifier> {
    pool: PgPool,
    caches: DiscoveryCaches,
    allocator: Arc<Allocator<N>>,
    snmp: SnmpDiscovery,
    config: DiscoveryConfig,
}

impl<N: DhcpReloadNotifier> DiscoveryEngine<N> {
    pub fn new(
        pool: PgPool,
        caches: DiscoveryCaches,
        allocator: Arc<Allocator<N>>,
        snmp: SnmpDiscovery,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            pool,
            caches,
            allocator,
            snmp,
            config,
        }
    }

    pub fn caches(&self) -> &DiscoveryCaches {
        &self.caches
    }

    /// §4.3: the full 9-step inventory auto-enrollment flow triggered by a
    /// DHCP lease request from an unclassified IPMI MAC.
    #[tracing::instrument(skip(self))]
    pub async fn dhcp_hook(&self, ipmi_mac: MacAddress, ipmi_ip: IpAddr, force: bool) -> FleetResult<()> {
        // Step 1.
        if self.caches.is_already_discovered(ipmi_mac, ipmi_ip) {
            return Ok(());
        }

        // Step 2/3: claim the in-flight slot; guard releases it on every
        // exit path below, including `?` early returns.
        if !self.caches.try_enter_in_flight(ipmi_mac) {
            return Ok(());
        }
        let _guard = InFlightGuard::new(&self.caches, ipmi_mac);

        if !force && self.caches.is_ignored(ipmi_mac) {
            return Ok(());
        }

        // Step 4.
        if let Some(asset) = fleet_db::assets::get_asset_by_ipmi_mac(&self.pool, ipmi_mac).await? {
            if fleet_db::servers::get_server_by_asset_id(&self.pool, asset.id)
                .await?
                .is_some()
            {
                self.caches.mark_discovered(ipmi_mac, ipmi_ip);
                return Ok(());
            }
        }

        // Step 5.
        if !self.config.auto_enroll && !force {
            self.caches.mark_ignored(ipmi_mac);
            return Ok(());
        }

        // Step 6.
        let Some(subnet) =
            fleet_db::subnets::find_subnet_containing(&self.pool, &self.config.location, ipmi_ip).await?
        else {
            tracing::debug!("no subnet contains {ipmi_ip}, ignoring");
            return Ok(());
        };
        let Some(rack) = fleet_db::switches::find_rack_by_subnet_network(&self.pool, &subnet).await? else {
            tracing::debug!("no rack owns subnet {}, ignoring", subnet.network);
            return Ok(());
        };
        if rack.worker_id != Some(self.config.worker_id) {
            return Ok(());
        }

        // Step 7.
        let vendor = self.snmp.vendor(ipmi_ip).await?;
        if vendor.is_unknown() {
            self.caches.mark_ignored(ipmi_mac);
            return Ok(());
        }
        let Some(inventory) = self.vendor_inventory(vendor, ipmi_ip).await? else {
            self.caches.mark_ignored(ipmi_mac);
            return Ok(());
        };
        let asset_type = classify_asset_type(&inventory.chassis_class);

        // Step 8.
        let asset = match fleet_db::assets::get_asset_by_serial(&self.pool, &inventory.serial).await? {
            Some(mut existing) => {
                if existing.ipmi_mac != ipmi_mac {
                    tracing::warn!(
                        serial = %inventory.serial,
                        existing_mac = %existing.ipmi_mac,
                        new_mac = %ipmi_mac,
                        "ipmi mac mismatch for known asset, ignoring"
                    );
                    self.caches.mark_ignored(ipmi_mac);
                    return Ok(());
                }
                if existing.protected {
                    existing.revert_protected_status();
                    fleet_db::assets::set_asset_status(&self.pool, existing.id, existing.status).await?;
                    self.caches.mark_ignored(ipmi_mac);
                    return Ok(());
                }
                fleet_db::assets::refresh_discovered_asset(
                    &self.pool,
                    existing.id,
                    ipmi_mac,
                    Some(ipmi_ip),
                    asset_type,
                )
                .await?
            }
            None => {
                let allocated_ip = self
                    .allocator
                    .allocate(&rack.name, &subnet, &inventory.serial, ipmi_mac, Some(ipmi_ip))
                    .await?;
                fleet_db::assets::create_asset(
                    &self.pool,
                    fleet_db::assets::NewAsset {
                        serial: inventory.serial.clone(),
                        brand: vendor.to_string(),
                        model: inventory.description.clone(),
                        ipmi_mac,
                        ipmi_ip: Some(allocated_ip),
                        asset_type,
                        rack_id: Some(rack.id),
                    },
                )
                .await?
            }
        };
        fleet_db::assets::set_asset_status(&self.pool, asset.id, AssetStatus::Discovered).await?;

        // Step 9.
        if asset.asset_type == AssetType::Server
            && fleet_db::servers::get_server_by_asset_id(&self.pool, asset.id)
                .await?
                .is_none()
        {
            self.enroll_server(&rack, asset.id, ipmi_ip).await?;
        }

        self.caches.mark_discovered(ipmi_mac, ipmi_ip);
        Ok(())
    }

    async fn vendor_inventory(
        &self,
        vendor: BmcVendor,
        ip: IpAddr,
    ) -> FleetResult<Option<fleet_ipmi::DellInventory>> {
        match vendor {
            BmcVendor::Dell => self.snmp.dell_walk(ip).await.map(Some),
            // Other known vendors aren't walked by this rewrite yet; treat
            // them the way an unknown vendor is treated rather than guessing.
            _ => Ok(None),
        }
    }

    async fn enroll_server(&self, rack: &Rack, asset_id: AssetId, ipmi_ip: IpAddr) -> FleetResult<()> {
        let spare = fleet_db::racks::get_or_create_cluster(
            &self.pool,
            &self.config.location,
            SPARE_POOL_CLUSTER_NAME,
            "spare-pool",
        )
        .await?;

        let creds = IpmiCreds {
            ip: ipmi_ip,
            user: self.config.ipmi_user.clone(),
            password: self.config.ipmi_password.clone(),
        };
        let vendor = self.snmp.vendor(ipmi_ip).await?;
        let mgmt_mac = fleet_ipmi::management_nic_mac(vendor, &creds).await?;

        // Name is a placeholder until `finalize` assigns the canonical
        // name/FQDN once server_number is known via C7.
        let mut server = fleet_db::servers::create_server(
            &self.pool,
            fleet_db::servers::NewServer {
                name: format!("pending-{asset_id}"),
                asset_id,
                role: "spare".to_string(),
                cluster_id: Some(spare.id),
                target_status: TargetStatus::Validated,
            },
        )
        .await?;

        server.pxe_mac = Some(mgmt_mac);
        fleet_db::servers::update_server(&self.pool, &server, server.version).await?;

        tracing::info!(
            server = %server.id,
            rack = %rack.name,
            "enrolled new server from discovery"
        );
        Ok(())
    }

    /// End-of-S1 backfill, §4.3: brand/model, in-band interfaces,
    /// server_number/rack_unit via C7, and the canonical name/FQDN.
    pub async fn finalize(
        &self,
        server: &mut Server,
        rack: &Rack,
        driver: &dyn SwitchDriver,
        switches: &[fleet_model::switch::Switch],
        net_map: &fleet_model::rack::NetworkMap,
        interfaces: Vec<ServerInterface>,
    ) -> FleetResult<()> {
        let pxe_mac = server
            .pxe_mac
            .ok_or_else(|| fleet_model::FleetError::InvalidData(format!("server {} has no pxe_mac", server.id)))?;

        let (server_number, rack_unit) = server_number_get(driver, switches, net_map, pxe_mac).await?;
        server.server_number = Some(server_number as i32);
        server.rack_unit = Some(rack_unit as i32);
        server.name = format!("{}-s{server_number}", rack.name);
        server.fqdn = Some(format!("{}.{}.fleet.internal", server.name, rack.location));

        fleet_db::servers::set_server_interfaces(&self.pool, server.id, &interfaces).await?;
        let expected = server.version;
        let updated = fleet_db::servers::update_server(&self.pool, server, expected).await?;
        *server = updated;
        Ok(())
    }
}

/// Classifies a SNMP-reported chassis class string into an [`AssetType`],
/// §4.3 step 8 ("type=vendor-reported"). Open question in spec.md §9 left
/// the exact mapping unspecified; this matches substrings the way
/// `BmcVendor::from_sys_object_id` matches OID components rather than
/// requiring an exact string.
fn classify_asset_type(chassis_class: &str) -> AssetType {
    let lower = chassis_class.to_ascii_lowercase();
    if lower.contains("switch") {
        AssetType::NetworkDevice
    } else if lower.contains("chassis") || lower.contains("enclosure") {
        AssetType::Chassis
    } else {
        AssetType::Server
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_asset_type_matches_known_substrings() {
        assert_eq!(classify_asset_type("RackServer"), AssetType::Server);
        assert_eq!(classify_asset_type("Top of Rack Switch"), AssetType::NetworkDevice);
        assert_eq!(classify_asset_type("Storage Enclosure"), AssetType::Chassis);
    }
}
