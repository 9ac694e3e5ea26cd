use std::net::IpAddr;

use fleet_model::FleetResult;

use crate::subprocess::run_with_retry;
use crate::vendor::BmcVendor;

/// Serial/chassis-class/description gathered from a Dell BMC via an
/// enterprise-OID SNMP walk, §6.
#[derive(Debug, Clone)]
pub struct DellInventory {
    pub serial: String,
    pub chassis_class: String,
    pub description: String,
}

/// Shells out to `snmpget`/`snmpwalk` for the discovery-time vendor probe,
/// §4.3 step 7 and §6.
pub struct SnmpDiscovery {
    community: String,
}

impl SnmpDiscovery {
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
        }
    }

    /// `GET sysObjectID.0`, the enterprise-OID discriminator for
    /// [`BmcVendor`].
    pub async fn vendor(&self, ip: IpAddr) -> FleetResult<BmcVendor> {
        let out = run_with_retry(
            "snmpget",
            &[
                "-v2c",
                "-c",
                &self.community,
                "-Ovq",
                &ip.to_string(),
                "sysObjectID.0",
            ],
        )
        .await?;
        Ok(BmcVendor::from_sys_object_id(out.trim()))
    }

    /// Dell serial/chassis/description via enterprise-OID walk, §6.
    pub async fn dell_walk(&self, ip: IpAddr) -> FleetResult<DellInventory> {
        let serial = run_with_retry(
            "snmpget",
            &[
                "-v2c",
                "-c",
                &self.community,
                "-Ovq",
                &ip.to_string(),
                ".1.3.6.1.4.1.674.10892.5.1.3.2.0",
            ],
        )
        .await?;
        let chassis_class = run_with_retry(
            "snmpget",
            &[
                "-v2c",
                "-c",
                &self.community,
                "-Ovq",
                &ip.to_string(),
                ".1.3.6.1.4.1.674.10892.5.1.3.12.0",
            ],
        )
        .await?;
        let description = run_with_retry(
            "snmpget",
            &[
                "-v2c",
                "-c",
                &self.community,
                "-Ovq",
                &ip.to_string(),
                "sysDescr.0",
            ],
        )
        .await?;

        Ok(DellInventory {
            serial: serial.trim().trim_matches('"').to_string(),
            chassis_class: chassis_class.trim().trim_matches('"').to_string(),
            description: description.trim().trim_matches('"').to_string(),
        })
    }
}
