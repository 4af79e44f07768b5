// External crates
use clap::Parser;
use tracing::{error, info};

// Internal imports
use vm_hypervisor::HypervisorError;
use vm_logging::{init_subscriber, LogSettings};

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

/// Render an error chain, with remediation hints for hypervisor failures.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<HypervisorError>() {
        Some(hypervisor_err) => hypervisor_err.user_friendly(),
        None => format!("{:#}", err),
    }
}

fn main() {
    let args = Args::parse();

    let _log_guard = init_subscriber(&LogSettings::from_env().with_debug(args.debug));

    if args.debug {
        info!("Starting vm-host command: {:?}", args.command);
    }

    // Execute the command and handle any top-level errors
    if let Err(e) = execute_command(args) {
        error!("{:#}", e);
        eprintln!("❌ {}", describe(&e));
        std::process::exit(1);
    }
}
