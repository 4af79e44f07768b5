use super::{DockerMachineHypervisor, SyncAttempt};
use crate::error::{HypervisorError, Result};
use crate::machine::MachineSubcommand;
use tracing::{error, info, instrument, warn};

const RUNNING_STATE: &str = "Running";

impl DockerMachineHypervisor {
    /// Make sure the VM exists, runs, and its environment is exported.
    ///
    /// Safe to call repeatedly. A VM that cannot be created is fatal and is
    /// not retried.
    #[instrument(skip(self), fields(vm = %self.vm_name, driver = %self.driver))]
    pub fn setup(&mut self) -> Result<()> {
        if !self.vms().contains(&self.vm_name) {
            let params = (self.get_config)();
            if !self.create(None, params) {
                self.failed_to_create(None);
                return Err(HypervisorError::CreateFailed {
                    driver: self.driver.to_string(),
                    vm_name: self.vm_name.clone(),
                });
            }
        }

        if !self.vm_running(None) {
            self.restore_vm(None)?;
        }
        self.sync_env(SyncAttempt::First)
    }

    fn failed_to_create(&self, vm_name: Option<&str>) {
        warn!(
            "{}: VM ({}) not found and create failed",
            self.driver,
            self.target(vm_name)
        );
    }

    /// Whether docker-machine reports the VM as `Running`.
    pub fn vm_running(&self, vm_name: Option<&str>) -> bool {
        let name = self.target(vm_name);
        match self.command(MachineSubcommand::Status, Some(name), &[], None) {
            Ok(output) => output.trim() == RUNNING_STATE,
            Err(e) => {
                warn!("{}: failed to get status of VM {}: {}", self.driver, name, e);
                false
            }
        }
    }

    pub fn start_vm(&self, vm_name: Option<&str>) -> Result<()> {
        let name = self.target(vm_name);
        info!("{}: starting VM {}", self.driver, name);
        self.command(MachineSubcommand::Start, Some(name), &[], None)
            .map_err(|e| {
                error!("{}: error starting VM {}: {}", self.driver, name, e);
                HypervisorError::from(e)
            })?;
        Ok(())
    }

    pub fn stop_vm(&self, vm_name: Option<&str>) -> bool {
        let name = self.target(vm_name);
        info!("{}: stopping VM {}", self.driver, name);
        match self.command(MachineSubcommand::Stop, Some(name), &[], None) {
            Ok(_) => true,
            Err(e) => {
                warn!("{}: error stopping VM {}: {}", self.driver, name, e);
                false
            }
        }
    }

    /// Remove the VM and its disk. Failure is reported as `false`.
    pub fn remove(&self, vm_name: Option<&str>) -> bool {
        let name = self.target(vm_name);
        info!("{}: removing VM {}", self.driver, name);
        match self.command(MachineSubcommand::Remove, Some(name), &[], None) {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "{}: error removing VM {}: {} -- {}",
                    self.driver,
                    name,
                    e,
                    e.stdout_text()
                );
                false
            }
        }
    }

    /// Bring a stopped VM back.
    pub fn restore_vm(&self, vm_name: Option<&str>) -> Result<()> {
        self.start_vm(vm_name)
    }

    /// Run `body` while the VM is stopped, start it again and re-sync the
    /// environment.
    ///
    /// The VM is started even when `body` fails; the body's error is returned
    /// after the environment has been refreshed.
    #[instrument(skip(self, body), fields(driver = %self.driver))]
    pub fn restart_with<T, F>(&mut self, vm_name: Option<&str>, body: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &str) -> Result<T>,
    {
        let name = self.target(vm_name).to_string();
        if self.vm_running(Some(&name)) {
            self.stop_vm(Some(&name));
        }

        let outcome = body(self, &name);

        self.start_vm(Some(&name))?;
        self.sync_env(SyncAttempt::First)?;
        outcome
    }
}
