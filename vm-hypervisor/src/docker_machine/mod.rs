//! The docker-machine VM lifecycle manager.
//!
//! One [`DockerMachineHypervisor`] owns exactly one named VM. It is built for
//! single-threaded use: every operation blocks on the driver tool and callers
//! serialize access themselves.

mod env_sync;
mod lifecycle;

pub use env_sync::SyncAttempt;

use crate::config::{CreateParams, HypervisorConfig, Timeouts, DEFAULT_VM_NAME};
use crate::container::{ContainerInspector, DockerCliInspector};
use crate::driver::{Constraints, Driver};
use crate::env::{EnvSnapshot, EnvironmentStore, InMemoryEnvironment, ProcessEnvironment};
use crate::error::{HypervisorError, Result};
use crate::machine::{parse_ip, parse_vm_list, DockerMachineCli, MachineCommand, MachineSubcommand};
use crate::recovery::MAX_RECOVERY_STEPS;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use vm_core::CommandError;

/// Produces the parameters for a fresh `create`.
pub type ConfigFn = Box<dyn Fn() -> CreateParams>;

pub struct DockerMachineHypervisor {
    vm_name: String,
    driver: Driver,
    machine: Box<dyn MachineCommand>,
    containers: Box<dyn ContainerInspector>,
    env_store: Box<dyn EnvironmentStore>,
    get_config: ConfigFn,
    timeouts: Timeouts,
    config_dir: Option<PathBuf>,
    environment: EnvSnapshot,
    max_recovery_steps: usize,
}

impl DockerMachineHypervisor {
    /// Manager for the default VM name with an in-memory environment.
    pub fn new<M, C, F>(driver: Driver, machine: M, containers: C, get_config: F) -> Self
    where
        M: MachineCommand + 'static,
        C: ContainerInspector + 'static,
        F: Fn() -> CreateParams + 'static,
    {
        Self {
            vm_name: DEFAULT_VM_NAME.to_string(),
            driver,
            machine: Box::new(machine),
            containers: Box::new(containers),
            env_store: Box::new(InMemoryEnvironment::new()),
            get_config: Box::new(get_config),
            timeouts: Timeouts::default(),
            config_dir: None,
            environment: EnvSnapshot::new(),
            max_recovery_steps: MAX_RECOVERY_STEPS,
        }
    }

    /// Production manager: real docker-machine and docker binaries, synced
    /// variables exported to the process environment.
    pub fn from_config(config: &HypervisorConfig) -> vm_core::Result<Self> {
        let machine = DockerMachineCli::new(config.machine_binary.clone())?;
        debug!("Using docker-machine at {}", machine.binary().display());
        let containers = DockerCliInspector::new(config.docker_binary.clone());
        let params_source = config.clone();
        Ok(
            Self::new(config.driver, machine, containers, move || {
                params_source.create_params()
            })
            .with_vm_name(&config.vm_name)
            .with_env_store(ProcessEnvironment)
            .with_timeouts(config.timeouts),
        )
    }

    pub fn with_vm_name(mut self, vm_name: &str) -> Self {
        self.vm_name = vm_name.to_string();
        self
    }

    pub fn with_env_store<E: EnvironmentStore + 'static>(mut self, store: E) -> Self {
        self.env_store = Box::new(store);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_max_recovery_steps(mut self, max_steps: usize) -> Self {
        self.max_recovery_steps = max_steps;
        self
    }

    pub fn vm_name(&self) -> &str {
        &self.vm_name
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Certificate directory from the last sync that exported one.
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Every variable synced so far.
    pub fn environment(&self) -> &EnvSnapshot {
        &self.environment
    }

    pub fn env_store(&self) -> &dyn EnvironmentStore {
        self.env_store.as_ref()
    }

    fn target<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.unwrap_or(&self.vm_name)
    }

    fn command(
        &self,
        subcommand: MachineSubcommand,
        vm_name: Option<&str>,
        args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<String, CommandError> {
        self.machine.run(subcommand, vm_name, args, timeout)
    }

    /// Create a VM. Tool failures are reported as `false`, never as errors.
    #[instrument(skip(self, params), fields(driver = %self.driver))]
    pub fn create(&self, vm_name: Option<&str>, mut params: CreateParams) -> bool {
        let name = self.target(vm_name);
        let constraints = Constraints::extract(&mut params);
        let args = self.driver.create_args(&constraints, &params);

        info!("{}: creating VM \"{}\"", self.driver, name);

        match self.command(MachineSubcommand::Create, Some(name), &args, None) {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "{}: error creating VM \"{}\": {} stdout=\"{}\"",
                    self.driver,
                    name,
                    e,
                    e.stdout_text()
                );
                false
            }
        }
    }

    /// Names of all VMs docker-machine knows about, broken ones included.
    ///
    /// A failing `ls` yields an empty list so callers can still go on and try
    /// to create or start the VM.
    pub fn vms(&self) -> Vec<String> {
        match self.command(MachineSubcommand::List, None, &[], None) {
            Ok(output) => parse_vm_list(&output),
            Err(e) => {
                warn!("Failed to list VMs: {}", e);
                Vec::new()
            }
        }
    }

    /// Host address and port where `port/tcp` of a container is reachable.
    #[instrument(skip(self), fields(vm = %self.vm_name))]
    pub fn get_port_mapping(&self, container_id: &str, port: u16) -> Result<(String, u16)> {
        let details = self
            .containers
            .inspect_container(container_id, &self.environment)?;
        let raw_port = details
            .tcp_host_port(port)
            .ok_or_else(|| HypervisorError::PortNotPublished {
                container_id: container_id.to_string(),
                port,
            })?;
        let host_port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|_| HypervisorError::InvalidHostPort {
                container_id: container_id.to_string(),
                value: raw_port.to_string(),
            })?;

        let raw_ip = self.command(MachineSubcommand::Ip, Some(&self.vm_name), &[], None)?;
        let ip = parse_ip(&raw_ip).ok_or_else(|| HypervisorError::MissingIpAddress {
            vm_name: self.vm_name.clone(),
            output: raw_ip.clone(),
        })?;

        Ok((ip, host_port))
    }
}
