use std::net::IpAddr;

use fleet_model::FleetResult;
use fleet_model::rack::{NetworkMap, Rack};
use fleet_model::server::Server;
use fleet_model::status::RackStatus;
use fleet_model::switch::Switch;
use mac_address::MacAddress;

use crate::driver::{DiscoveredSwitch, SwitchDriver};

/// §4.7: `switch_discover`. Metadata for a newly-found switch so C8 can
/// insert an Asset + NetworkDevice skeleton.
pub async fn switch_discover(
    driver: &dyn SwitchDriver,
    hostname: &str,
    ip: IpAddr,
) -> FleetResult<DiscoveredSwitch> {
    driver.discover(hostname, ip).await
}

/// §4.7: `switch_validate_for_rack`. Rack-level validation is cached — a
/// rack already `Validated` short-circuits without re-probing hardware.
pub async fn switch_validate_for_rack(
    driver: &dyn SwitchDriver,
    rack: &Rack,
    switches: &[Switch],
    expected_vlans: &[u16],
) -> FleetResult<(RackStatus, String)> {
    if rack.status == RackStatus::Validated {
        return Ok((RackStatus::Validated, "already validated".to_string()));
    }

    let _guard = driver.lock_rack_config(&rack.name).await;

    let mut messages = Vec::new();
    let mut hard_failure = false;

    for switch in switches {
        let features = driver.features(switch).await?;
        for f in &features {
            if !f.ok {
                hard_failure = true;
                messages.push(format!("{}: feature {} failed: {}", switch.name, f.name, f.detail));
            }
        }

        let service_ports = driver.service_ports(switch).await?;
        for p in service_ports.iter().filter(|p| !p.up) {
            hard_failure = true;
            messages.push(format!("{}: service port {} down", switch.name, p.port_no));
        }

        let l3 = driver.l3_interfaces(switch).await?;
        for iface in l3.iter().filter(|iface| !iface.up) {
            // Missing BMC/management MACs are demoted to informational per §4.7.
            if iface.vlan == 0 {
                messages.push(format!(
                    "{}: bmc-management l3 interface vlan {} down (informational)",
                    switch.name, iface.vlan
                ));
                continue;
            }
            hard_failure = true;
            messages.push(format!("{}: l3 interface vlan {} down", switch.name, iface.vlan));
        }

        let vlans = driver.vlans(switch, expected_vlans).await?;
        for v in vlans.iter().filter(|v| !v.present) {
            hard_failure = true;
            messages.push(format!("{}: expected vlan {} missing", switch.name, v.vlan));
        }
    }

    let message = if messages.is_empty() {
        "all checks passed".to_string()
    } else {
        messages.join("; ")
    };

    if hard_failure {
        Ok((RackStatus::ValidatedWithErrors, message))
    } else {
        Ok((RackStatus::Validated, message))
    }
}

/// §4.7: `switch_validate_for_server`. Any failure here raises and
/// prevents S1->S2 — unlike the rack-level check there is no
/// ValidatedWithErrors path.
pub async fn switch_validate_for_server(
    driver: &dyn SwitchDriver,
    switch: &Switch,
    server: &Server,
) -> FleetResult<()> {
    let server_number = server.server_number.ok_or_else(|| {
        fleet_model::FleetError::InvalidData(format!("server {} has no server_number", server.id))
    })?;

    let rack_name = Switch::parse_index(&switch.name).map(|(rack, _)| rack).unwrap_or_default();
    let _guard = driver.lock_server_config(rack_name, server_number as u32).await;

    let bonds = driver.lacp_bonds(switch, server_number as u32).await?;
    if bonds.is_empty() {
        return Err(fleet_model::FleetError::InvalidData(format!(
            "server {}: no LACP bonds found on {}",
            server.id, switch.name
        )));
    }
    for bond in &bonds {
        if !bond.all_up {
            return Err(fleet_model::FleetError::InvalidData(format!(
                "server {}: bond {} on {} has a down member among {:?}",
                server.id, bond.bond_name, switch.name, bond.member_ports
            )));
        }
    }

    let service_ports = driver.service_ports(switch).await?;
    if service_ports.iter().any(|p| !p.up) {
        return Err(fleet_model::FleetError::InvalidData(format!(
            "server {}: mgmt service port down on {}",
            server.id, switch.name
        )));
    }

    Ok(())
}

/// §4.7: `server_number_get`. Resolves the pxe MAC to `(switch, port)`,
/// parses the switch name into `(rack_name, switch_index)`, applies the
/// NetworkMap's `mgmt_port_map` to get a server number, then
/// `number_to_unit` for the rack unit.
pub async fn server_number_get(
    driver: &dyn SwitchDriver,
    switches: &[Switch],
    net_map: &NetworkMap,
    pxe_mac: MacAddress,
) -> FleetResult<(u32, u32)> {
    for switch in switches {
        let Some(port_no) = driver.find_mac(switch, pxe_mac).await? else {
            continue;
        };
        let Some((_, switch_index)) = Switch::parse_index(&switch.name) else {
            return Err(fleet_model::FleetError::InvalidData(format!(
                "switch name {} does not follow the <rack>-sw<index> convention",
                switch.name
            )));
        };
        let server_number = net_map.mgmt_port_map.resolve(switch_index, port_no).ok_or_else(|| {
            fleet_model::FleetError::not_found(format!(
                "no mgmt_port_map entry for switch {switch_index} port {port_no}"
            ))
        })?;
        let rack_unit = net_map.number_to_unit(server_number).ok_or_else(|| {
            fleet_model::FleetError::not_found(format!(
                "no number_to_unit entry for server number {server_number}"
            ))
        })?;
        return Ok((server_number, rack_unit));
    }

    Err(fleet_model::FleetError::not_found(format!(
        "pxe mac {pxe_mac} not found in any switch mac table"
    )))
}
