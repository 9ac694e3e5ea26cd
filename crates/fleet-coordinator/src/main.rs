mod cli;

use std::net::SocketAddr;
use std::str::FromStr;

use cli::Options;
use fleet_config::Config;
use fleet_coordinator::dispatch::RemoteDispatch;
use fleet_coordinator::route_cache::RouteCache;
use fleet_coordinator::service::CoordinatorServiceImpl;
use fleet_rpc::proto::coordinator_service_server::CoordinatorServiceServer;
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;

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
    let coordinator_cfg = config.master()?.clone();

    let pool = PgPool::connect_with(PgConnectOptions::from_str(&config.common.db_url)?).await?;

    let routes = RouteCache::new();
    let dispatch = RemoteDispatch::new("fleetd-coordinator");
    let service = CoordinatorServiceImpl::new(pool, routes, dispatch);

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", coordinator_cfg.port).parse()?;
    tracing::info!(%listen_addr, "fleetd-coordinator listening");
    tonic::transport::Server::builder()
        .add_service(CoordinatorServiceServer::new(service))
        .serve(listen_addr)
        .await?;

    Ok(())
}
