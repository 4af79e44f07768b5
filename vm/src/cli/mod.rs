// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "vm-host")]
#[command(about = "Keep a docker-machine VM ready to run containers")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a vm-host.yaml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the VM if needed, start it and export its docker environment
    Setup,
    /// List every VM docker-machine knows about
    List,
    /// Create the VM from the configured resources and driver flags
    Create,
    /// Show whether the VM is running
    Status,
    /// Sync the docker environment and print it as VAR=value lines
    Env,
    /// Show where a container port is reachable from the host
    Port {
        /// Container ID or name
        container: String,
        /// Container port (TCP)
        port: u16,
    },
    /// Stop and start the VM, then re-sync its environment
    Restart,
}
