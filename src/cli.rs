use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the config and snapshot files.
    /// Defaults to ~/.rtriage
    #[clap(long)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web daemon
    Daemon {},

    /// Rank reports against a free-text query
    Search {
        /// Search query
        query: String,
    },

    /// Route a point against the configured areas
    Route {
        /// Longitude of the report location
        #[clap(long)]
        lng: f64,

        /// Latitude of the report location
        #[clap(long)]
        lat: f64,

        /// Report id to stamp into the routing result
        #[clap(long)]
        id: Option<String>,
    },

    /// List areas from the current snapshot
    Areas {
        /// Only list active areas
        #[clap(long, default_value = "false")]
        active: bool,
    },
}
