mod cli;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cli::Options;
use fleet_config::Config;
use fleet_discovery::caches::DiscoveryCaches;
use fleet_discovery::engine::{DiscoveryConfig, DiscoveryEngine};
use fleet_ipmi::SnmpDiscovery;
use fleet_provisioning::rest_backend::RestBackend;
use fleet_rpc::proto::worker_service_server::WorkerServiceServer;
use fleet_switch::SshSwitchDriver;
use fleet_worker::dispatch::LocalDispatch;
use fleet_worker::registry::TaskRegistry;
use fleet_worker::rpc::WorkerServiceImpl;
use fleet_worker::validation_agent::ValidationAgentClient;
use fleet_worker::worker_loop::{WorkerLoop, WorkerLoopConfig};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;

const DISCOVERY_IGNORED_TTL: Duration = Duration::from_secs(60 * 60);
const DISCOVERY_IGNORED_CAPACITY: usize = 4096;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = Options::load();
    if opts.version {
        println!("{}", fleet_version::version!());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::load(&opts.config)?;
    let worker_cfg = config.worker()?.clone();

    let metrics_addr: SocketAddr = format!("0.0.0.0:{}", worker_cfg.metrics_port).parse()?;
    fleet_worker::metrics::install_exporter(metrics_addr)?;
    tracing::info!(%metrics_addr, "prometheus exporter listening");

    let pool = PgPool::connect_with(PgConnectOptions::from_str(&config.common.db_url)?).await?;

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", worker_cfg.port).parse()?;
    let endpoint_url = format!("http://{}:{}", worker_cfg.name, worker_cfg.port);
    let worker = fleet_db::racks::upsert_worker(&pool, &worker_cfg.name, &config.common.location, &endpoint_url)
        .await?;
    tracing::info!(worker = %worker.id, name = %worker.name, "registered with inventory store");

    let backend_cfg = config
        .backend
        .as_ref()
        .ok_or_else(|| eyre::eyre!("[backend] config section is required for fleetd-worker"))?;
    let adapter: Arc<dyn fleet_provisioning::adapter::ProvisioningAdapter> = Arc::new(RestBackend::new(
        backend_cfg.base_url.clone(),
        backend_cfg.api_token.clone(),
        backend_cfg.verification_os.clone(),
        backend_cfg.dns_executable.clone(),
        worker_cfg.default_dns_zone.clone(),
    ));

    let switch_driver: Arc<dyn fleet_switch::SwitchDriver> =
        Arc::new(SshSwitchDriver::new(worker_cfg.switch_ssh_user.clone()));

    let validation_agent = Arc::new(ValidationAgentClient::new(worker_cfg.validation_port));

    let registry = Arc::new(TaskRegistry::new());
    let dispatch = LocalDispatch::new(
        pool.clone(),
        registry.clone(),
        adapter.clone(),
        switch_driver.clone(),
        validation_agent,
    );

    let dhcp_cfg = config
        .dhcp()
        .map_err(|e| eyre::eyre!("discovery or decommission needs [dhcp]: {e}"))?;
    let notifier = fleet_db::ShellDhcpReloadNotifier::new(
        dhcp_cfg.reload_command.clone(),
        dhcp_cfg.subnets_command.clone(),
    );
    let allocator = Arc::new(fleet_db::Allocator::new(pool.clone(), notifier));
    let ipmi_vlan = *worker_cfg.net2vlan.get("ipmi").unwrap_or(&0) as i32;

    let discovery = if worker_cfg.discovery_disabled {
        None
    } else {
        let snmp = SnmpDiscovery::new(worker_cfg.snmp_community.clone());
        let caches = DiscoveryCaches::new(DISCOVERY_IGNORED_TTL, DISCOVERY_IGNORED_CAPACITY);
        Some(Arc::new(DiscoveryEngine::new(
            pool.clone(),
            caches,
            allocator.clone(),
            snmp,
            DiscoveryConfig {
                worker_id: worker.id,
                location: config.common.location.clone(),
                auto_enroll: worker_cfg.auto_enroll,
                ipmi_user: worker_cfg.ipmi_user.clone(),
                ipmi_password: worker_cfg.ipmi_password.clone(),
            },
        )))
    };

    let (worker_loop, _stop_sender) = WorkerLoop::new(
        pool.clone(),
        registry.clone(),
        dispatch.clone(),
        worker.id,
        WorkerLoopConfig::default(),
    );

    let loop_handle = tokio::spawn(worker_loop.run());
    let heartbeat_handle = tokio::spawn(heartbeat(pool.clone(), worker.id));

    let service = WorkerServiceImpl::new(pool, registry, dispatch, discovery, adapter, allocator, ipmi_vlan);
    tracing::info!(%listen_addr, "fleetd-worker listening");
    tonic::transport::Server::builder()
        .add_service(WorkerServiceServer::new(service))
        .serve(listen_addr)
        .await?;

    loop_handle.abort();
    heartbeat_handle.abort();
    Ok(())
}

async fn heartbeat(pool: PgPool, worker_id: fleet_model::ids::WorkerId) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = fleet_db::racks::touch_worker(&pool, worker_id).await {
            tracing::warn!(error = %e, "failed to refresh worker heartbeat");
        }
    }
}
