//! Environment synchronization and the recovery cascade behind it.

use super::DockerMachineHypervisor;
use crate::config::CreateParams;
use crate::env::EnvSnapshot;
use crate::error::{HypervisorError, Result, DOCKER_MACHINE_REMEDIATION};
use crate::machine::MachineSubcommand;
use crate::recovery::{Recovery, RecoveryStage};
use tracing::{debug, error, info, instrument, warn};

const ENV_SHELL_ARGS: [&str; 2] = ["--shell", "cmd"];

/// Whether a sync may still hand over to the recovery cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAttempt {
    First,
    /// After recovery; a failure here is final.
    Retry,
}

impl DockerMachineHypervisor {
    /// Sync the VM's environment, recovering the VM if the export fails.
    pub fn update_env(&mut self) -> Result<&EnvSnapshot> {
        self.sync_env(SyncAttempt::First)?;
        Ok(&self.environment)
    }

    #[instrument(skip(self), fields(vm = %self.vm_name))]
    pub(crate) fn sync_env(&mut self, attempt: SyncAttempt) -> Result<()> {
        let args: Vec<String> = ENV_SHELL_ARGS.iter().map(|a| a.to_string()).collect();
        let result = self.command(MachineSubcommand::Env, Some(&self.vm_name), &args, None);
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to update env for VM: {}", e);
                debug!("docker-machine output: {}", e.stdout_text());
                return match attempt {
                    SyncAttempt::First => self.recover(),
                    SyncAttempt::Retry => {
                        error!("{}", DOCKER_MACHINE_REMEDIATION);
                        Err(HypervisorError::EnvironmentSync {
                            vm_name: self.vm_name.clone(),
                            source: e,
                        })
                    }
                };
            }
        };

        if output.trim().is_empty() {
            warn!("{}: env update failed, no output for VM {}", self.driver, self.vm_name);
            return Ok(());
        }

        let snapshot = EnvSnapshot::parse(&output);
        self.apply_snapshot(&snapshot);
        info!("{}: env updated ({} variables)", self.driver, snapshot.len());
        Ok(())
    }

    fn apply_snapshot(&mut self, snapshot: &EnvSnapshot) {
        self.env_store.apply(snapshot);
        self.environment.merge(snapshot);
        if let Some(cert_dir) = snapshot.cert_dir() {
            debug!("Certificate directory: {}", cert_dir.display());
            self.config_dir = Some(cert_dir);
        }
    }

    /// Escalate from regenerating certificates to restarting to recreating
    /// the VM, then make one last attempt at syncing the environment.
    fn recover(&mut self) -> Result<()> {
        let mut recovery = Recovery::with_max_steps(self.max_recovery_steps);
        let mut last_sync = None;
        let mut next = recovery.advance(true);

        while let Some(stage) = next {
            if stage.is_terminal() {
                info!("Recovery of {} finished: {:?}", self.vm_name, recovery.history());
                return last_sync.unwrap_or(Ok(()));
            }
            debug!("Recovery stage: {:?}", stage);

            let succeeded = match stage {
                RecoveryStage::RegeneratingCerts => self.regenerate_certs(),
                RecoveryStage::Restarting => self.restart_for_recovery(),
                RecoveryStage::Recreating => {
                    self.recreate();
                    true
                }
                RecoveryStage::Syncing => {
                    let result = self.sync_env(SyncAttempt::Retry);
                    let succeeded = result.is_ok();
                    last_sync = Some(result);
                    succeeded
                }
                RecoveryStage::Idle | RecoveryStage::Done | RecoveryStage::Failed => true,
            };
            next = recovery.advance(succeeded);
        }

        error!(
            "Recovery of {} stopped at {:?} after {} steps",
            self.vm_name,
            recovery.stage(),
            recovery.history().len()
        );
        Err(HypervisorError::RecoveryExhausted {
            vm_name: self.vm_name.clone(),
            steps: recovery.history().len(),
        })
    }

    fn regenerate_certs(&self) -> bool {
        let timeout = self.timeouts.regenerate_certs();
        match self.command(
            MachineSubcommand::RegenerateCerts,
            Some(&self.vm_name),
            &[],
            Some(timeout),
        ) {
            Ok(_) => {
                info!("{}: regenerated certificates for {}", self.driver, self.vm_name);
                true
            }
            Err(e) if e.is_timeout() => {
                warn!("Timeout in regenerate certificates: {} -- {}", e, e.stdout_text());
                false
            }
            Err(e) => {
                warn!("Failed to regenerate certificates: {} -- {}", e, e.stdout_text());
                false
            }
        }
    }

    fn restart_for_recovery(&self) -> bool {
        let timeout = self.timeouts.restart();
        match self.command(MachineSubcommand::Restart, Some(&self.vm_name), &[], Some(timeout)) {
            Ok(_) => {
                info!("{}: restarted {}", self.driver, self.vm_name);
                true
            }
            Err(e) if e.is_timeout() => {
                warn!("Timeout in restart the VM: {} -- {}", e, e.stdout_text());
                false
            }
            Err(e) => {
                warn!("Failed to restart the VM: {} -- {}", e, e.stdout_text());
                false
            }
        }
    }

    /// Best effort: failures are logged and the cascade carries on.
    fn recreate(&self) {
        warn!("{}: re-creating VM {}", self.driver, self.vm_name);
        if self.remove(None) && !self.create(None, CreateParams::new()) {
            warn!("{}: failed to re-create the VM {}", self.driver, self.vm_name);
        }
    }
}
