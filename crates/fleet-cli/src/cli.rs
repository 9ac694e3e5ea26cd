use clap::{ArgAction, Parser};

#[derive(Parser)]
#[clap(name = "fleetctl")]
pub struct Options {
    #[clap(long, default_value = "false", help = "Print version number and exit")]
    pub version: bool,

    #[clap(short, long, action = ArgAction::Count)]
    pub debug: u8,

    #[clap(subcommand)]
    pub sub_cmd: Option<Command>,
}

#[derive(Parser)]
pub enum Command {
    #[clap(subcommand)]
    Db(Db),
}

#[derive(Parser)]
pub enum Db {
    #[clap(about = "Checks that the configured datastore is reachable")]
    Control(DbArgs),
    #[clap(about = "Runs pending migrations")]
    Upgrade(DbArgs),
    #[clap(about = "Prints the highest applied migration version")]
    Version(DbArgs),
}

#[derive(Parser)]
pub struct DbArgs {
    #[clap(long, require_equals(true), env = "DATABASE_URL")]
    pub datastore: String,
}

impl Options {
    pub fn load() -> Self {
        Self::parse()
    }
}
