use clap::Parser;

#[derive(Parser)]
#[clap(name = "fleetd-worker")]
pub struct Options {
    #[clap(long, default_value = "false", help = "Print version number and exit")]
    pub version: bool,

    #[clap(long, env = "FLEET_CONFIG", default_value = "/etc/fleet/worker.toml")]
    pub config: String,
}

impl Options {
    pub fn load() -> Self {
        Self::parse()
    }
}
