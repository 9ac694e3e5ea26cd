use std::net::IpAddr;

use fleet_model::FleetResult;
use fleet_model::ids::{PortId, RackId, SubnetId};
use fleet_model::network::{Port, RackAndVlan, Subnet};
use mac_address::MacAddress;
use sqlx::PgPool;
use tokio::sync::Mutex;

/// Downstream DHCP distributor, notified whenever the allocator's view of
/// `Port` rows changes. The default adapter shells a reload command; tests
/// substitute a recording fake.
#[async_trait::async_trait]
pub trait DhcpReloadNotifier: Send + Sync {
    /// Requests a reload of allocations for `rack`. Failure here is
    /// retriable per §4.2 — the Port row already persisted stays.
    async fn reload(&self, rack: &str) -> FleetResult<()>;

    /// Re-syncs which subnets the DHCP plane serves for `rack` (management +
    /// IPMI only), called when a rack gains a worker owner.
    async fn ensure_subnets(&self, rack: &str, subnets: &[Subnet]) -> FleetResult<()>;
}

/// Shells `<reload_command> <rack>` / `<subnets_command> <rack>` the way
/// `fleet-ipmi` shells vendor CLI tooling. The default production
/// [`DhcpReloadNotifier`] — subnet sync is passed as a JSON array on stdin
/// since a DHCP plane's subnet list doesn't fit on a command line.
pub struct ShellDhcpReloadNotifier {
    reload_command: String,
    subnets_command: String,
}

impl ShellDhcpReloadNotifier {
    pub fn new(reload_command: impl Into<String>, subnets_command: impl Into<String>) -> Self {
        Self {
            reload_command: reload_command.into(),
            subnets_command: subnets_command.into(),
        }
    }
}

#[async_trait::async_trait]
impl DhcpReloadNotifier for ShellDhcpReloadNotifier {
    async fn reload(&self, rack: &str) -> FleetResult<()> {
        run(&self.reload_command, &[rack]).await
    }

    async fn ensure_subnets(&self, rack: &str, subnets: &[Subnet]) -> FleetResult<()> {
        use std::process::Stdio;

        use tokio::io::AsyncWriteExt;

        let payload = serde_json::to_vec(subnets)
            .map_err(|e| fleet_model::FleetError::InvalidData(format!("subnets not serializable: {e}")))?;

        let mut child = tokio::process::Command::new(&self.subnets_command)
            .arg(rack)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| fleet_model::FleetError::ExecError {
                code: -1,
                stdout: format!("failed to spawn {}: {e}", self.subnets_command),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| fleet_model::FleetError::ExecError {
                code: -1,
                stdout: format!("failed writing subnets to {}: {e}", self.subnets_command),
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| fleet_model::FleetError::ExecError {
            code: -1,
            stdout: format!("failed waiting for {}: {e}", self.subnets_command),
        })?;

        let stdout = fleet_model::sanitize_stdout(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            return Err(fleet_model::FleetError::ExecError {
                code: output.status.code().unwrap_or(-1),
                stdout,
            });
        }
        Ok(())
    }
}

async fn run(program: &str, args: &[&str]) -> FleetResult<()> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| fleet_model::FleetError::ExecError {
            code: -1,
            stdout: format!("failed to spawn {program}: {e}"),
        })?;

    let stdout = fleet_model::sanitize_stdout(&String::from_utf8_lossy(&output.stdout));
    if !output.status.success() {
        return Err(fleet_model::FleetError::ExecError {
            code: output.status.code().unwrap_or(-1),
            stdout,
        });
    }
    Ok(())
}

/// Serializes IP selection behind the "allocator" named mutex from §5: one
/// `tokio::sync::Mutex` per process, held for the duration of an
/// allocation decision so concurrent callers never race on the same vlan.
pub struct Allocator<N: DhcpReloadNotifier> {
    pool: PgPool,
    notifier: N,
    lock: Mutex<()>,
}

impl<N: DhcpReloadNotifier> Allocator<N> {
    pub fn new(pool: PgPool, notifier: N) -> Self {
        Self {
            pool,
            notifier,
            lock: Mutex::new(()),
        }
    }

    /// `allocate(rack, subnet, serial, mac, ip?) -> ip`, §4.2.
    pub async fn allocate(
        &self,
        rack_name: &str,
        subnet: &Subnet,
        serial: &str,
        mac: MacAddress,
        requested_ip: Option<IpAddr>,
    ) -> FleetResult<IpAddr> {
        let _guard = self.lock.lock().await;

        if let Some(existing) = sqlx::query_as::<_, Port>(
            "SELECT * FROM ports WHERE rack_name = $1 AND vlan_tag = $2 AND device_id = $3",
        )
        .bind(rack_name)
        .bind(subnet.vlan)
        .bind(serial)
        .fetch_optional(&self.pool)
        .await?
        {
            if let Some(requested) = requested_ip {
                if requested != existing.ip {
                    return Err(fleet_model::FleetError::conflict(format!(
                        "port for {serial} on vlan {} already allocated {}, requested {}",
                        subnet.vlan, existing.ip, requested
                    )));
                }
            }
            return Ok(existing.ip);
        }

        let ip = match requested_ip {
            Some(ip) => {
                if !subnet.contains(ip) {
                    return Err(fleet_model::FleetError::InvalidData(format!(
                        "{ip} is not within subnet {}",
                        subnet.network
                    )));
                }
                ip
            }
            None => self.lowest_unused_ip(rack_name, subnet).await?,
        };

        sqlx::query(
            r#"
            INSERT INTO ports (id, rack_name, device_id, vlan_tag, ip, mac, subnet_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
            "#,
        )
        .bind(PortId::new().0)
        .bind(rack_name)
        .bind(serial)
        .bind(subnet.vlan)
        .bind(ip)
        .bind(mac)
        .bind(subnet.id.0)
        .execute(&self.pool)
        .await?;

        self.notifier.reload(rack_name).await?;
        Ok(ip)
    }

    /// Lowest unused address in `subnet[first_offset..last_offset]`,
    /// excluding existing Port rows in that vlan on that rack.
    /// `first_offset` defaults from `subnet.first_usable_ip`; `last_offset`
    /// defaults to -3 (network/broadcast/gateway reserved at the tail).
    async fn lowest_unused_ip(&self, rack_name: &str, subnet: &Subnet) -> FleetResult<IpAddr> {
        let network = match subnet.network {
            ipnetwork::IpNetwork::V4(net) => net,
            ipnetwork::IpNetwork::V6(_) => {
                return Err(fleet_model::FleetError::InvalidData(
                    "only IPv4 subnets are supported".to_string(),
                ));
            }
        };

        let used: Vec<IpAddr> = sqlx::query_scalar(
            "SELECT ip FROM ports WHERE rack_name = $1 AND vlan_tag = $2",
        )
        .bind(rack_name)
        .bind(subnet.vlan)
        .fetch_all(&self.pool)
        .await?;

        let first = match subnet.first_usable_ip {
            Some(IpAddr::V4(first)) => first,
            _ => {
                let mut iter = network.iter();
                iter.next();
                iter.next().unwrap_or(network.network())
            }
        };

        let candidates: Vec<_> = network.iter().collect();
        let last_index = candidates.len().saturating_sub(3);

        for candidate in candidates
            .into_iter()
            .take(last_index)
            .skip_while(|ip| u32::from(*ip) < u32::from(first))
        {
            let candidate = IpAddr::V4(candidate);
            if Some(candidate) == subnet.gateway {
                continue;
            }
            if !used.contains(&candidate) {
                return Ok(candidate);
            }
        }

        Err(fleet_model::FleetError::InvalidData(format!(
            "subnet {} is exhausted",
            subnet.network
        )))
    }

    /// Removes every Port for `serial` except any whose `vlan_tag` is in
    /// `ignored_vlans` (e.g. the ipmi vlan, kept during re-imaging), then
    /// triggers a reload. Callers resolve network names (e.g. "ipmi") to
    /// vlan tags via `worker.net2vlan` before calling this — `ports.vlan_tag`
    /// is already the numeric tag, so no join through `subnets` is needed
    /// and no name-vs-tag mismatch can occur.
    pub async fn delete_for_serial(
        &self,
        rack_name: &str,
        serial: &str,
        ignored_vlans: &[i32],
    ) -> FleetResult<()> {
        let _guard = self.lock.lock().await;

        sqlx::query("DELETE FROM ports WHERE rack_name = $1 AND device_id = $2 AND vlan_tag <> ALL($3)")
            .bind(rack_name)
            .bind(serial)
            .bind(ignored_vlans)
            .execute(&self.pool)
            .await?;

        self.notifier.reload(rack_name).await
    }

    /// Re-syncs which subnets the DHCP plane serves for a rack, §4.2, called
    /// when a rack gains a worker owner.
    pub async fn ensure_subnets(&self, rack_name: &str, subnets: &[Subnet]) -> FleetResult<()> {
        let _guard = self.lock.lock().await;
        self.notifier.ensure_subnets(rack_name, subnets).await
    }
}

pub async fn ports_for_rack_and_vlan(
    pool: &PgPool,
    key: RackAndVlan,
    subnet_id: SubnetId,
) -> FleetResult<Vec<Port>> {
    sqlx::query_as::<_, Port>(
        "SELECT p.* FROM ports p WHERE p.subnet_id = $1 AND p.vlan_tag = $2",
    )
    .bind(subnet_id.0)
    .bind(key.vlan)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}
