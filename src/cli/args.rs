use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct MainArgs {
    /// The path to the config file for the dashboard
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Base URL of the vehicle-control backend, overriding the config file
    #[clap(long, short)]
    pub backend: Option<String>,

    /// Telemetry poll interval in milliseconds, overriding the config file
    #[clap(long, short)]
    pub interval: Option<u64>,

    /// The path to a text file containing a list of commands to execute
    #[clap(long, short)]
    pub script: Option<PathBuf>,
}
