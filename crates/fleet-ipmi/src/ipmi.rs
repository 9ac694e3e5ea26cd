use std::net::IpAddr;
use std::str::FromStr;

use fleet_model::{FleetError, FleetResult};
use mac_address::MacAddress;
use regex::Regex;

use crate::subprocess::run_with_retry;
use crate::vendor::BmcVendor;

/// Out-of-band IPMI credentials for a single BMC.
#[derive(Debug, Clone)]
pub struct IpmiCreds {
    pub ip: IpAddr,
    pub user: String,
    pub password: String,
}

/// `restart_pxe`, §6: `chassis bootdev pxe` then power on (if currently off)
/// or power cycle, via `ipmitool lanplus`.
pub async fn restart_pxe(creds: &IpmiCreds) -> FleetResult<()> {
    run_ipmitool(creds, &["chassis", "bootdev", "pxe"]).await?;

    let power_status = run_ipmitool(creds, &["chassis", "power", "status"]).await?;
    if power_status.to_lowercase().contains("is off") {
        run_ipmitool(creds, &["chassis", "power", "on"]).await?;
    } else {
        run_ipmitool(creds, &["chassis", "power", "cycle"]).await?;
    }
    Ok(())
}

async fn run_ipmitool(creds: &IpmiCreds, args: &[&str]) -> FleetResult<String> {
    let ip = creds.ip.to_string();
    let mut full_args = vec![
        "-I",
        "lanplus",
        "-H",
        &ip,
        "-U",
        &creds.user,
        "-P",
        &creds.password,
    ];
    full_args.extend_from_slice(args);
    run_with_retry("ipmitool", &full_args).await
}

/// NIC MAC lookup is vendor-specific, §6. Dell uses `idracadm7 hwinventory`
/// and a regex on "Current MAC Address"; other vendors are not yet
/// supported by this rewrite and surface `FleetError::Ignore` so discovery
/// treats them the way an unknown vendor is treated (§4.3 step 7).
pub async fn management_nic_mac(vendor: BmcVendor, creds: &IpmiCreds) -> FleetResult<MacAddress> {
    match vendor {
        BmcVendor::Dell => dell_management_nic_mac(creds).await,
        other => Err(FleetError::ignore(format!(
            "NIC MAC lookup not implemented for vendor {other}"
        ))),
    }
}

async fn dell_management_nic_mac(creds: &IpmiCreds) -> FleetResult<MacAddress> {
    let ip = creds.ip.to_string();
    let out = run_with_retry(
        "idracadm7",
        &[
            "-r",
            &ip,
            "-u",
            &creds.user,
            "-p",
            &creds.password,
            "get",
            "hwinventory",
        ],
    )
    .await?;

    let re = Regex::new(r"(?i)Current MAC Address\s*=\s*([0-9A-Fa-f:]{17})")
        .expect("static regex is valid");
    let captured = re
        .captures(&out)
        .and_then(|c| c.get(1))
        .ok_or_else(|| FleetError::ignore("no management MAC found in hwinventory output"))?;

    MacAddress::from_str(captured.as_str())
        .map_err(|e| FleetError::InvalidData(format!("malformed MAC in hwinventory output: {e}")))
}
