use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::net::IpAddr;

use crate::ids::{PortId, RackId, ServerInterfaceId, SubnetId, SwitchInterfaceId};

/// (location, ip, mask, vlan, gateway, tagged?, first-usable-ip), §3.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subnet {
    pub id: SubnetId,
    pub location: String,
    pub network: IpNetwork,
    pub vlan: i32,
    pub gateway: Option<IpAddr>,
    pub tagged: bool,
    pub first_usable_ip: Option<IpAddr>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subnet {
    /// Whether `ip` falls within this subnet's network, used by C3 step 6
    /// to resolve a subnet by containment of the IPMI IP.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.network.contains(ip)
    }
}

/// A server's in-band interface, owned by Server; deletion cascades with
/// the parent, §3.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerInterface {
    pub id: ServerInterfaceId,
    pub name: String,
    pub mac: MacAddress,
    pub ip: Option<IpAddr>,
    pub netmask: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub network_address: Option<IpAddr>,
}

/// A ToR switch's interface, owned by Switch; deletion cascades, §3.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwitchInterface {
    pub id: SwitchInterfaceId,
    pub name: String,
    pub mac: Option<MacAddress>,
    pub ip: Option<IpAddr>,
    pub netmask: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub network_address: Option<IpAddr>,
}

/// A DHCP lease record, keyed by ip, §3. Despite the name this has nothing
/// to do with a physical switch port — see the glossary.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Port {
    pub id: PortId,
    pub rack_name: String,
    pub device_id: String,
    pub vlan_tag: i32,
    pub ip: IpAddr,
    pub mac: MacAddress,
    pub subnet_id: SubnetId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RackAndVlan {
    pub rack_id: RackId,
    pub vlan: i32,
}
