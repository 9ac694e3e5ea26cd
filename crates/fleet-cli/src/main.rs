mod cli;

use std::str::FromStr;

use clap::CommandFactory;
use cli::{Command, Db, DbArgs, Options};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Options::load();
    if config.version {
        println!("{}", fleet_version::version!());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let sub_cmd = match &config.sub_cmd {
        None => return Ok(Options::command().print_long_help()?),
        Some(s) => s,
    };

    match sub_cmd {
        Command::Db(Db::Control(args)) => db_control(args).await?,
        Command::Db(Db::Upgrade(args)) => db_upgrade(args).await?,
        Command::Db(Db::Version(args)) => db_version(args).await?,
    }
    Ok(())
}

async fn connect(args: &DbArgs) -> eyre::Result<PgPool> {
    let options = PgConnectOptions::from_str(&args.datastore)?;
    Ok(PgPool::connect_with(options).await?)
}

async fn db_control(args: &DbArgs) -> eyre::Result<()> {
    let pool = connect(args).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    println!("datastore reachable");
    Ok(())
}

async fn db_upgrade(args: &DbArgs) -> eyre::Result<()> {
    let pool = connect(args).await?;
    tracing::info!("running migrations");
    fleet_db::migrations::migrate(&pool).await?;
    println!("migrations applied");
    Ok(())
}

async fn db_version(args: &DbArgs) -> eyre::Result<()> {
    let pool = connect(args).await?;
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM _sqlx_migrations ORDER BY version DESC LIMIT 1")
        .fetch_optional(&pool)
        .await?;
    match row {
        Some((version,)) => println!("{version}"),
        None => println!("no migrations applied"),
    }
    Ok(())
}
