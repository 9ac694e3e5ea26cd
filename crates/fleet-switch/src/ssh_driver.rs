use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use fleet_model::FleetResult;
use fleet_model::switch::Switch;
use mac_address::MacAddress;
use regex::Regex;
use tokio::process::Command;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::driver::{
    DiscoveredSwitch, FeatureCheck, L3InterfaceStatus, LacpBondStatus, ServicePortStatus,
    SwitchDriver, VlanStatus,
};

const SSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Shells out to `ssh <host> <vendor show command>` the way `fleet-ipmi`
/// shells out to `ipmitool`/`idracadm7`. Credentials are supplied via the
/// operator's existing SSH config (`~/.ssh/config` `Host` entries keyed by
/// switch hostname), matching how this workspace already keeps BMC/switch
/// secrets out of process args.
pub struct SshSwitchDriver {
    user: String,
    /// §5 named mutex `switchconf_rack`: serializes config-changing sessions
    /// against the same rack's pair of switches (vlan/port-channel edits
    /// touch both switches in a rack and must not interleave).
    switchconf_rack: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// §5 named mutex `switchconf_server`: serializes config-changing
    /// sessions scoped to a single server's ports, keyed `rack:server_number`.
    switchconf_server: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SshSwitchDriver {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            switchconf_rack: Mutex::new(HashMap::new()),
            switchconf_server: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the named per-key mutex from `locks`, creating its entry on
    /// first use. The returned owned guard must be held for the duration of
    /// any command sequence that reconfigures the switch(es) it scopes.
    async fn lock_key(locks: &Mutex<HashMap<String, Arc<Mutex<()>>>>, key: &str) -> OwnedMutexGuard<()> {
        let mut table = locks.lock().await;
        let entry = table.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        drop(table);
        entry.lock_owned().await
    }

    /// §5 `switchconf_rack`: holds for the lifetime of the returned guard.
    pub async fn lock_rack_config(&self, rack_name: &str) -> OwnedMutexGuard<()> {
        Self::lock_key(&self.switchconf_rack, rack_name).await
    }

    /// §5 `switchconf_server`: holds for the lifetime of the returned guard.
    pub async fn lock_server_config(&self, rack_name: &str, server_number: u32) -> OwnedMutexGuard<()> {
        Self::lock_key(&self.switchconf_server, &format!("{rack_name}:{server_number}")).await
    }

    async fn run(&self, switch: &Switch, command: &str) -> FleetResult<String> {
        self.run_host(&switch.name, command).await
    }

    async fn run_host(&self, host: &str, command: &str) -> FleetResult<String> {
        let target = format!("{}@{host}", self.user);
        let output = tokio::time::timeout(
            SSH_TIMEOUT,
            Command::new("ssh")
                .args(["-o", "BatchMode=yes", &target, command])
                .output(),
        )
        .await
        .map_err(|_| fleet_model::FleetError::ExecError {
            code: -1,
            stdout: format!("ssh {target} timed out running '{command}'"),
        })?
        .map_err(|e| fleet_model::FleetError::ExecError {
            code: -1,
            stdout: format!("failed to spawn ssh to {target}: {e}"),
        })?;

        let stdout = fleet_model::sanitize_stdout(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            return Err(fleet_model::FleetError::ExecError {
                code: output.status.code().unwrap_or(-1),
                stdout,
            });
        }
        Ok(stdout)
    }
}

#[async_trait::async_trait]
impl SwitchDriver for SshSwitchDriver {
    async fn features(&self, switch: &Switch) -> FleetResult<Vec<FeatureCheck>> {
        let out = self.run(switch, "show feature").await?;
        let re = Regex::new(r"(?m)^(\S+)\s+(\d+)\s+(enabled|disabled)").expect("static regex is valid");
        Ok(re
            .captures_iter(&out)
            .map(|c| FeatureCheck {
                name: c[1].to_string(),
                ok: &c[3] == "enabled",
                detail: format!("instance {}: {}", &c[2], &c[3]),
            })
            .collect())
    }

    async fn service_ports(&self, switch: &Switch) -> FleetResult<Vec<ServicePortStatus>> {
        let out = self.run(switch, "show interface status").await?;
        let re = Regex::new(r"(?m)^Eth\S*/(\d+)\s+.*\b(connected|notconnect)\b").expect("static regex is valid");
        Ok(re
            .captures_iter(&out)
            .filter_map(|c| {
                Some(ServicePortStatus {
                    port_no: c[1].parse().ok()?,
                    up: &c[2] == "connected",
                })
            })
            .collect())
    }

    async fn l3_interfaces(&self, switch: &Switch) -> FleetResult<Vec<L3InterfaceStatus>> {
        let out = self.run(switch, "show ip interface brief vrf all").await?;
        let re = Regex::new(r"(?m)^Vlan(\d+)\s+(\S+)\s+.*\b(up|down)\b").expect("static regex is valid");
        Ok(re
            .captures_iter(&out)
            .filter_map(|c| {
                Some(L3InterfaceStatus {
                    vlan: c[1].parse().ok()?,
                    ip: c[2].parse().ok()?,
                    up: &c[3] == "up",
                })
            })
            .collect())
    }

    async fn vlans(&self, switch: &Switch, expected: &[u16]) -> FleetResult<Vec<VlanStatus>> {
        let out = self.run(switch, "show vlan brief").await?;
        Ok(expected
            .iter()
            .map(|&vlan| VlanStatus {
                vlan,
                present: out.lines().any(|l| l.trim_start().starts_with(&vlan.to_string())),
            })
            .collect())
    }

    async fn lacp_bonds(&self, switch: &Switch, server_number: u32) -> FleetResult<Vec<LacpBondStatus>> {
        let bond_name = format!("port-channel{server_number}");
        let out = self.run(switch, &format!("show port-channel summary interface {bond_name}")).await?;
        let member_re = Regex::new(r"Eth\S*/(\d+)\(([PDS])\)").expect("static regex is valid");
        let mut member_ports = Vec::new();
        let mut all_up = !out.is_empty();
        for c in member_re.captures_iter(&out) {
            member_ports.push(c[1].parse().unwrap_or_default());
            if &c[2] != "P" {
                all_up = false;
            }
        }
        Ok(vec![LacpBondStatus {
            bond_name,
            member_ports,
            all_up,
        }])
    }

    async fn find_mac(&self, switch: &Switch, mac: MacAddress) -> FleetResult<Option<u16>> {
        let mac_str = mac.to_string().to_lowercase();
        let out = self.run(switch, &format!("show mac address-table address {mac_str}")).await?;
        let re = Regex::new(r"Eth\S*/(\d+)").expect("static regex is valid");
        Ok(re.captures(&out).and_then(|c| c[1].parse().ok()))
    }

    async fn discover(&self, hostname: &str, ip: IpAddr) -> FleetResult<DiscoveredSwitch> {
        let host = ip.to_string();
        let version = self.run_host(&host, "show version").await?;
        let inventory = self.run_host(&host, "show inventory").await?;

        let brand = if version.to_lowercase().contains("cisco") {
            "Cisco"
        } else if version.to_lowercase().contains("arista") {
            "Arista"
        } else {
            "unknown"
        }
        .to_string();

        let model_re = Regex::new(r#"DESCR:\s*"([^"]+)""#).expect("static regex is valid");
        let model = model_re
            .captures(&inventory)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let serial_re = Regex::new(r"SN:\s*(\S+)").expect("static regex is valid");
        let serial = serial_re
            .captures(&inventory)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let rack_name = hostname.rsplit_once("-sw").map(|(rack, _)| rack.to_string()).unwrap_or_default();

        let iface_out = self.run_host(&host, "show interface status").await?;
        let iface_re = Regex::new(r"(?m)^(Eth\S*/\d+)").expect("static regex is valid");
        let interfaces = iface_re.captures_iter(&iface_out).map(|c| c[1].to_string()).collect();

        Ok(DiscoveredSwitch {
            hostname: hostname.to_string(),
            brand,
            model,
            serial,
            interfaces,
            rack_name,
        })
    }

    async fn lock_rack_config(&self, rack_name: &str) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        Some(self.lock_rack_config(rack_name).await)
    }

    async fn lock_server_config(
        &self,
        rack_name: &str,
        server_number: u32,
    ) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        Some(self.lock_server_config(rack_name, server_number).await)
    }
}
