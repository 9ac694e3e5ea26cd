//! Typed configuration, §6. Sources are merged by
//! [`figment`](https://docs.rs/figment): a TOML file first, then
//! `FLEET_`-prefixed environment variables (double underscore as the
//! section separator, e.g. `FLEET_WORKER__PORT`) on top, so operators can
//! override any file-based key without editing it.

use std::collections::HashMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// `common.*`, §6: present in every process regardless of role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    pub location: String,
    pub db_url: String,
}

/// `master.*`, §6: the coordinator's listen port. Named after the config
/// section, not the crate (`fleet-coordinator` reads it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub port: u16,
}

/// `worker.*`, §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    pub port: u16,
    pub fqdn_net: String,
    pub validation_port: u16,
    pub default_dns_zone: String,
    #[serde(default)]
    pub net2vlan: HashMap<String, u16>,
    #[serde(default)]
    pub discovery_disabled: bool,
    pub spare_cluster: String,
    #[serde(default)]
    pub auto_enroll: bool,
    #[serde(default)]
    pub ipmi_user: String,
    #[serde(default)]
    pub ipmi_password: String,
    #[serde(default)]
    pub switch_ssh_user: String,
    #[serde(default)]
    pub snmp_community: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_metrics_port() -> u16 {
    9100
}

/// `dhcp.*`, §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhcpConfig {
    pub first_ip_offset: u32,
    pub last_ip_offset: u32,
    pub driver: String,
    #[serde(default)]
    pub reload_command: String,
    #[serde(default)]
    pub subnets_command: String,
}

/// `openstack.*`, §6: one of the provisioning back-ends a worker may be
/// configured against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStackConfig {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project: String,
    pub region: String,
}

/// Back-end-specific URL/credentials, §6, for the REST host-management
/// back-end ([`fleet_provisioning::RestBackend`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: String,
    pub verification_os: String,
    pub dns_executable: String,
}

/// `switchconf.*`, §6.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwitchConfConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Root config document. `master`/`worker` are optional since a given
/// process plays one role or the other (§6); `openstack`/`backend` are
/// optional since only one provisioning back-end is configured at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub common: CommonConfig,
    pub master: Option<CoordinatorConfig>,
    pub worker: Option<WorkerConfig>,
    #[serde(default)]
    pub dhcp: Option<DhcpConfig>,
    pub openstack: Option<OpenStackConfig>,
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub switchconf: SwitchConfConfig,
}

impl Config {
    /// Loads from `path` (TOML), then layers `FLEET_`-prefixed env vars on
    /// top, e.g. `FLEET_COMMON__LOCATION=DC2` overrides `common.location`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FLEET_").split("__"))
            .extract()
    }

    /// Builds directly from an in-memory default plus env overrides, for
    /// tests and for callers that assemble config programmatically rather
    /// than from a file on disk.
    pub fn from_defaults(defaults: &Config) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(defaults))
            .merge(Env::prefixed("FLEET_").split("__"))
            .extract()
    }

    pub fn worker(&self) -> Result<&WorkerConfig, ConfigError> {
        self.worker.as_ref().ok_or(ConfigError::MissingSection("worker"))
    }

    pub fn master(&self) -> Result<&CoordinatorConfig, ConfigError> {
        self.master.as_ref().ok_or(ConfigError::MissingSection("master"))
    }

    pub fn dhcp(&self) -> Result<&DhcpConfig, ConfigError> {
        self.dhcp.as_ref().ok_or(ConfigError::MissingSection("dhcp"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config is missing required section [{0}]")]
    MissingSection(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_worker_config_from_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "fleet.toml",
                r#"
                [common]
                location = "DC1"
                db_url = "postgres://localhost/fleet"

                [worker]
                name = "w1"
                port = 9000
                fqdn_net = "10.0.0.0/24"
                validation_port = 5000
                default_dns_zone = "fleet.internal"
                spare_cluster = "spare-pool"

                [worker.net2vlan]
                mgmt = 100

                [dhcp]
                first_ip_offset = 10
                last_ip_offset = 250
                driver = "isc"
                "#,
            )?;

            let config = Config::load("fleet.toml").unwrap();
            assert_eq!(config.common.location, "DC1");
            assert_eq!(config.worker().unwrap().port, 9000);
            assert_eq!(config.worker().unwrap().net2vlan.get("mgmt"), Some(&100));
            assert_eq!(config.dhcp().unwrap().driver, "isc");
            assert!(config.master.is_none());
            Ok(())
        });
    }

    #[test]
    fn env_override_wins_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "fleet.toml",
                r#"
                [common]
                location = "DC1"
                db_url = "postgres://localhost/fleet"
                "#,
            )?;
            jail.set_env("FLEET_COMMON__LOCATION", "DC2");

            let config = Config::load("fleet.toml").unwrap();
            assert_eq!(config.common.location, "DC2");
            Ok(())
        });
    }

    #[test]
    fn missing_worker_section_is_a_typed_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "fleet.toml",
                r#"
                [common]
                location = "DC1"
                db_url = "postgres://localhost/fleet"
                "#,
            )?;

            let config = Config::load("fleet.toml").unwrap();
            assert!(matches!(config.worker(), Err(ConfigError::MissingSection("worker"))));
            Ok(())
        });
    }
}
