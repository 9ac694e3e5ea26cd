use std::net::IpAddr;

use fleet_model::{FleetError, FleetResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three recognized `code` payloads, §6. The in-band agent evaluates
/// `code` against `server_dict` and writes its answer into a well-known
/// `RESULT` variable; from this side these are opaque identifiers the agent
/// recognizes, not scripts this crate interprets.
const CODE_SERVER_INFO: &str = "server_info";
const CODE_VALIDATION_SCRIPT: &str = "validation_script";
const CODE_RAID_CONFIGURE: &str = "raid_configure";

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    server_dict: &'a Value,
    code: &'static str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    result: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskInfo {
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub disk_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareInfo {
    pub ram: String,
    pub cpu: String,
    #[serde(default)]
    pub disks: Vec<DiskInfo>,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl HardwareInfo {
    /// Reduces the reported hardware into the `(cpu, ram, storage)` triple
    /// [`fleet_model::sku::Sku::matches`] compares by exact string equality.
    pub fn as_observed(&self) -> fleet_model::sku::ObservedHardware {
        fleet_model::sku::ObservedHardware {
            cpu: self.cpu.clone(),
            ram: self.ram.clone(),
            storage: summarize_storage(&self.disks),
        }
    }
}

/// Formats grouped disks as `"<count>x<bin>GB <type>"` per group, joined
/// with `", "`, sorted by group key for deterministic SKU comparison.
pub fn summarize_storage(disks: &[DiskInfo]) -> String {
    group_disks(disks)
        .into_iter()
        .map(|((disk_type, bin), count)| format!("{count}x{bin}GB {disk_type}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveredInterface {
    pub name: String,
    pub mac: mac_address::MacAddress,
    pub ip: Option<IpAddr>,
    pub netmask: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub network_address: Option<IpAddr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub asset: Value,
    #[serde(default)]
    pub interfaces: Vec<DiscoveredInterface>,
}

/// Client for the in-band validation wire, §6: POSTs `{server_dict, code}`
/// to `http://<server-mgmt-ip>:<port>/v1.0/validate` and reads back
/// `{result: ...}`.
pub struct ValidationAgentClient {
    http: reqwest::Client,
    port: u16,
}

impl ValidationAgentClient {
    pub fn new(port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn url(&self, mgmt_ip: IpAddr) -> String {
        format!("http://{mgmt_ip}:{}/v1.0/validate", self.port)
    }

    async fn call(&self, mgmt_ip: IpAddr, server_dict: &Value, code: &'static str) -> FleetResult<Value> {
        let response = self
            .http
            .post(self.url(mgmt_ip))
            .json(&ValidateRequest { server_dict, code })
            .send()
            .await
            .map_err(|e| FleetError::Transport(format!("validation agent at {mgmt_ip}: {e}")))?;

        if !response.status().is_success() {
            return Err(FleetError::ProvisionIncomplete(format!(
                "validation agent at {mgmt_ip} returned {}",
                response.status()
            )));
        }

        let body: ValidateResponse = response
            .json()
            .await
            .map_err(|e| FleetError::Transport(format!("malformed validation agent response: {e}")))?;
        Ok(body.result)
    }

    pub async fn server_info(&self, mgmt_ip: IpAddr, server_dict: &Value) -> FleetResult<ServerInfo> {
        let result = self.call(mgmt_ip, server_dict, CODE_SERVER_INFO).await?;
        serde_json::from_value(result)
            .map_err(|e| FleetError::InvalidData(format!("malformed server_info result: {e}")))
    }

    pub async fn validation_script(&self, mgmt_ip: IpAddr, server_dict: &Value) -> FleetResult<HardwareInfo> {
        let result = self.call(mgmt_ip, server_dict, CODE_VALIDATION_SCRIPT).await?;
        serde_json::from_value(result)
            .map_err(|e| FleetError::InvalidData(format!("malformed validation_script result: {e}")))
    }

    /// Idempotently clears and initializes the RAID array.
    pub async fn raid_configure(&self, mgmt_ip: IpAddr, server_dict: &Value) -> FleetResult<()> {
        self.call(mgmt_ip, server_dict, CODE_RAID_CONFIGURE).await?;
        Ok(())
    }
}

/// Size/type grouping for SKU matching, §6: bins disk sizes into decimal-GB
/// buckets (1000-based, not 1024-based) so e.g. a 1.92TB and a 2TB drive
/// reported with slightly different raw byte counts land in the same bin.
pub fn decimal_gb_bin(size_bytes: u64) -> u64 {
    size_bytes / 1_000_000_000
}

/// Groups disks by `(type, decimal_gb_bin)`, returning counts per group, so
/// a SKU's expected disk layout can be compared against what the agent
/// reported.
pub fn group_disks(disks: &[DiskInfo]) -> std::collections::BTreeMap<(String, u64), u32> {
    let mut groups = std::collections::BTreeMap::new();
    for disk in disks {
        let key = (disk.disk_type.clone(), decimal_gb_bin(disk.size_bytes));
        *groups.entry(key).or_insert(0) += 1;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_gb_bin_uses_1000_based_units() {
        assert_eq!(decimal_gb_bin(1_920_000_000_000), 1920);
        assert_eq!(decimal_gb_bin(2_000_000_000_000), 2000);
    }

    #[test]
    fn as_observed_summarizes_storage_deterministically() {
        let info = HardwareInfo {
            ram: "512GB".to_string(),
            cpu: "2x EPYC 7742".to_string(),
            disks: vec![
                DiskInfo { size_bytes: 3_840_000_000_000, disk_type: "NVMe".to_string() },
                DiskInfo { size_bytes: 3_840_000_000_000, disk_type: "NVMe".to_string() },
            ],
            interfaces: vec![],
        };
        let observed = info.as_observed();
        assert_eq!(observed.cpu, "2x EPYC 7742");
        assert_eq!(observed.ram, "512GB");
        assert_eq!(observed.storage, "2x3840GB NVMe");
    }

    #[test]
    fn group_disks_counts_by_type_and_bin() {
        let disks = vec![
            DiskInfo { size_bytes: 2_000_000_000_000, disk_type: "nvme".to_string() },
            DiskInfo { size_bytes: 2_000_000_000_000, disk_type: "nvme".to_string() },
            DiskInfo { size_bytes: 960_000_000_000, disk_type: "ssd".to_string() },
        ];
        let groups = group_disks(&disks);
        assert_eq!(groups.get(&("nvme".to_string(), 2000)), Some(&2));
        assert_eq!(groups.get(&("ssd".to_string(), 960)), Some(&1));
    }
}
