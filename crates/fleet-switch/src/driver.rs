use std::net::IpAddr;

use fleet_model::FleetResult;
use fleet_model::switch::Switch;
use mac_address::MacAddress;

/// A single ToR feature check result (e.g. "dhcp-relay", "storm-control"),
/// §4.7.
#[derive(Debug, Clone)]
pub struct FeatureCheck {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ServicePortStatus {
    pub port_no: u16,
    pub up: bool,
}

#[derive(Debug, Clone)]
pub struct L3InterfaceStatus {
    pub vlan: u16,
    pub ip: IpAddr,
    pub up: bool,
}

#[derive(Debug, Clone)]
pub struct VlanStatus {
    pub vlan: u16,
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct LacpBondStatus {
    pub bond_name: String,
    pub member_ports: Vec<u16>,
    pub all_up: bool,
}

/// Metadata `switch_discover` (§4.7) reports for a newly-found switch.
#[derive(Debug, Clone)]
pub struct DiscoveredSwitch {
    pub hostname: String,
    pub brand: String,
    pub model: String,
    pub serial: String,
    pub interfaces: Vec<String>,
    pub rack_name: String,
}

/// Live switch-device access, §4.7 and §6. A real implementation shells
/// out to vendor CLI tooling over SSH the way `fleet-ipmi` shells out to
/// `ipmitool`/`snmpget`; this crate defines only the contract so unit
/// tests can exercise the validation logic against a fake.
#[async_trait::async_trait]
pub trait SwitchDriver: Send + Sync {
    async fn features(&self, switch: &Switch) -> FleetResult<Vec<FeatureCheck>>;
    async fn service_ports(&self, switch: &Switch) -> FleetResult<Vec<ServicePortStatus>>;
    async fn l3_interfaces(&self, switch: &Switch) -> FleetResult<Vec<L3InterfaceStatus>>;
    async fn vlans(&self, switch: &Switch, expected: &[u16]) -> FleetResult<Vec<VlanStatus>>;
    async fn lacp_bonds(&self, switch: &Switch, server_number: u32) -> FleetResult<Vec<LacpBondStatus>>;

    /// Resolves a PXE MAC to the `(switch_name, port_no)` it was last seen
    /// on via the switch's MAC address table, for `server_number_get`.
    async fn find_mac(&self, switch: &Switch, mac: MacAddress) -> FleetResult<Option<u16>>;

    async fn discover(&self, hostname: &str, ip: IpAddr) -> FleetResult<DiscoveredSwitch>;

    /// §5 named mutex `switchconf_rack`: held for the duration of a
    /// multi-command session against a rack's switch pair so validation
    /// reads aren't interleaved with another worker's session against the
    /// same rack. Drivers with no such concern (fakes, tests) keep the
    /// default no-op.
    async fn lock_rack_config(&self, _rack_name: &str) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        None
    }

    /// §5 named mutex `switchconf_server`: the server-scoped counterpart of
    /// [`SwitchDriver::lock_rack_config`].
    async fn lock_server_config(
        &self,
        _rack_name: &str,
        _server_number: u32,
    ) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        None
    }
}
