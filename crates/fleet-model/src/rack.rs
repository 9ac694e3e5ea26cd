use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::{ClusterId, NetworkMapId, RackId, WorkerId};
use crate::status::RackStatus;

/// A rack of servers at a location, §3.
///
/// `worker_id` is the routing-only ownership the coordinator (C8) resolves
/// requests through; it carries no lifetime semantics over the rack itself
/// (a rack outlives any worker that happens to own it).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rack {
    pub id: RackId,
    pub name: String,
    pub location: String,
    pub status: RackStatus,
    pub gateway_ip: Option<std::net::IpAddr>,
    pub environment: String,
    pub sku_count_quota: i32,
    pub worker_id: Option<WorkerId>,
    pub network_map_id: Option<NetworkMapId>,
    #[sqlx(json)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: i32,
}

/// A worker registers itself on start, upserting by (name, location), §3.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub location: String,
    pub endpoint_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: i32,
}

/// Declarative description of a rack's physical network, §3.
///
/// Immutable once referenced by a rack in production (enforced by
/// `fleet-db`, not by this type). `mgmt_port_map` and `number_to_unit`
/// replace the original's string-eval'd expressions (spec.md §9 open
/// question) with a plain lookup table, resolved by
/// `fleet-switch::server_number_get`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NetworkMap {
    pub id: NetworkMapId,
    pub name: String,
    #[sqlx(json)]
    pub mgmt_port_map: MgmtPortMap,
    #[sqlx(json)]
    pub number_to_unit: HashMap<u32, u32>,
    pub pxe_nic_name: String,
    #[sqlx(json)]
    pub topology: NetworkTopology,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `(switch_index, port_no) -> server_number`, replacing the
/// `network_map.mgmt_port_map` string-eval from the source system
/// (spec.md §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MgmtPortMap {
    pub entries: Vec<MgmtPortMapEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MgmtPortMapEntry {
    pub switch_index: u8,
    pub port_no: u16,
    pub server_number: u32,
}

impl MgmtPortMap {
    pub fn resolve(&self, switch_index: u8, port_no: u16) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.switch_index == switch_index && e.port_no == port_no)
            .map(|e| e.server_number)
    }
}

impl NetworkMap {
    pub fn number_to_unit(&self, server_number: u32) -> Option<u32> {
        self.number_to_unit.get(&server_number).copied()
    }
}

/// Per-interface/bond/vlan topology of a rack's cabling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkTopology {
    pub interfaces: Vec<TopologyInterface>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyInterface {
    pub name: String,
    pub bond_members: Vec<String>,
    pub vlan: Option<u16>,
    pub tagged: bool,
    pub network_name: String,
}

/// A cluster groups servers by role, §3. The pre-created "spare-pool"
/// cluster receives servers discovered by C3.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    pub location: String,
    pub cluster_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: i32,
}

pub const SPARE_POOL_CLUSTER_NAME: &str = "spare-pool";
