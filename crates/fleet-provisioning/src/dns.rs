use std::net::IpAddr;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use fleet_model::{FleetError, FleetResult};
use tokio::process::Command;
use tokio::time::timeout;

const DNS_TOOL_TIMEOUT: Duration = Duration::from_secs(30);
const DNS_RETRY_DELAY: Duration = Duration::from_secs(3);
const DNS_RETRY_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsAction {
    Change,
    Delete,
}

impl DnsAction {
    fn as_str(self) -> &'static str {
        match self {
            DnsAction::Change => "change",
            DnsAction::Delete => "delete",
        }
    }
}

/// Wraps the configured DNS maintenance executable, §6: `--action
/// change|delete --fqdn ... --type A,PTR --value <ip> --ttl 3600`.
pub struct DnsTool {
    executable: String,
}

impl DnsTool {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub async fn upsert(&self, fqdn: &str, ip: IpAddr) -> FleetResult<()> {
        self.run(DnsAction::Change, fqdn, Some(ip)).await
    }

    pub async fn remove(&self, fqdn: &str) -> FleetResult<()> {
        self.run(DnsAction::Delete, fqdn, None).await
    }

    async fn run(&self, action: DnsAction, fqdn: &str, ip: Option<IpAddr>) -> FleetResult<()> {
        let ip_string = ip.map(|ip| ip.to_string());
        let backoff = ConstantBuilder::default()
            .with_delay(DNS_RETRY_DELAY)
            .with_max_times(DNS_RETRY_ATTEMPTS);

        (|| run_once(&self.executable, action, fqdn, ip_string.as_deref()))
            .retry(backoff)
            .when(|e: &FleetError| !e.is_ignore())
            .notify(|err, dur| {
                tracing::warn!(?dur, error = %err, "retrying dns tool call");
            })
            .await
    }
}

async fn run_once(
    executable: &str,
    action: DnsAction,
    fqdn: &str,
    ip: Option<&str>,
) -> FleetResult<()> {
    let mut cmd = Command::new(executable);
    cmd.arg("--action").arg(action.as_str());
    cmd.arg("--fqdn").arg(fqdn);
    cmd.arg("--type").arg("A,PTR");
    if let Some(ip) = ip {
        cmd.arg("--value").arg(ip);
        cmd.arg("--ttl").arg("3600");
    }

    let output = timeout(DNS_TOOL_TIMEOUT, cmd.output())
        .await
        .map_err(|_| FleetError::ExecError {
            code: -1,
            stdout: "dns tool timed out".to_string(),
        })?
        .map_err(|e| FleetError::ExecError {
            code: -1,
            stdout: format!("failed to spawn dns tool: {e}"),
        })?;

    if !output.status.success() {
        return Err(FleetError::ExecError {
            code: output.status.code().unwrap_or(-1),
            stdout: fleet_model::sanitize_stdout(&String::from_utf8_lossy(&output.stdout)),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_strings_match_tool_contract() {
        assert_eq!(DnsAction::Change.as_str(), "change");
        assert_eq!(DnsAction::Delete.as_str(), "delete");
    }
}
