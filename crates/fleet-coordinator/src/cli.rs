use clap::Parser;

#[derive(Parser)]
#[clap(name = "fleetd-coordinator")]
pub struct Options {
    #[clap(long, default_value = "false", help = "Print version number and exit")]
    pub version: bool,

    #[clap(long, env = "FLEET_CONFIG", default_value = "/etc/fleet/coordinator.toml")]
    pub config: String,
}

impl Options {
    pub fn load() -> Self {
        Self::parse()
    }
}
