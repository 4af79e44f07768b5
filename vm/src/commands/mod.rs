// Command handlers for the container host

use crate::cli::{Args, Command};
use anyhow::{bail, Context, Result};
use tracing::debug;
use vm_hypervisor::{DockerMachineHypervisor, HypervisorConfig};

/// Main command dispatcher
#[must_use = "command execution results should be handled"]
pub fn execute_command(args: Args) -> Result<()> {
    let config = HypervisorConfig::load(args.config.as_deref())?;
    debug!(
        "Managing VM '{}' with the {} driver",
        config.vm_name, config.driver
    );
    let mut manager = DockerMachineHypervisor::from_config(&config)?;

    match args.command {
        Command::Setup => {
            manager.setup()?;
            println!("✅ VM '{}' is ready", manager.vm_name());
            if let Some(dir) = manager.config_dir() {
                println!("   Certificates: {}", dir.display());
            }
        }
        Command::List => {
            for name in manager.vms() {
                let marker = if name == manager.vm_name() { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
        Command::Create => {
            if !manager.create(None, config.create_params()) {
                bail!(
                    "{}: failed to create VM '{}' (see the log above)",
                    config.driver,
                    config.vm_name
                );
            }
            println!("✅ Created VM '{}'", manager.vm_name());
        }
        Command::Status => {
            let state = if manager.vm_running(None) {
                "Running"
            } else {
                "Not running"
            };
            println!("{}: {}", manager.vm_name(), state);
        }
        Command::Env => {
            let snapshot = manager.update_env()?;
            for (var, value) in snapshot.iter() {
                println!("{}={}", var, value);
            }
        }
        Command::Port { container, port } => {
            let (ip, host_port) = manager
                .get_port_mapping(&container, port)
                .with_context(|| format!("Could not map {}:{}", container, port))?;
            println!("{}:{}", ip, host_port);
        }
        Command::Restart => {
            manager.restart_with(None, |_, name| {
                debug!("VM '{}' stopped", name);
                Ok(())
            })?;
            println!("✅ Restarted VM '{}'", manager.vm_name());
        }
    }

    Ok(())
}
