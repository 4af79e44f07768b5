//! Error types for hypervisor operations.
//!
//! Most tool failures are absorbed by the manager (listing, creation, status
//! checks). The variants here are the ones that reach the caller.

use thiserror::Error;
use vm_core::CommandError;

/// Guidance shown when the environment cannot be synced even after recovery.
pub const DOCKER_MACHINE_REMEDIATION: &str = "\
It seems there is a problem with your Docker installation.
Ensure that you try the following before reporting an issue:

 1. The virtualization of Intel VT-x/EPT or AMD-V/RVI is enabled in BIOS
    or virtual machine settings.
 2. The windows feature 'Hyper-V' is enabled (Hyper-V driver only).
 3. docker-machine is in your path: `docker-machine --version`
 4. `docker-machine ls` lists the VM without errors";

#[derive(Error, Debug)]
pub enum HypervisorError {
    #[error("{driver}: no VM available and failed to create '{vm_name}'")]
    CreateFailed { driver: String, vm_name: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to sync environment for VM '{vm_name}': {source}")]
    EnvironmentSync {
        vm_name: String,
        #[source]
        source: CommandError,
    },

    #[error("container '{container_id}' does not publish port {port}/tcp")]
    PortNotPublished { container_id: String, port: u16 },

    #[error("container '{container_id}' reports invalid host port '{value}'")]
    InvalidHostPort { container_id: String, value: String },

    #[error("no IP address found for VM '{vm_name}' in output: {output:?}")]
    MissingIpAddress { vm_name: String, output: String },

    #[error("container inspection failed: {0}")]
    Inspect(String),

    #[error("recovery of VM '{vm_name}' did not settle after {steps} steps")]
    RecoveryExhausted { vm_name: String, steps: usize },
}

impl HypervisorError {
    /// Convert the error into a message with remediation hints where we have them.
    pub fn user_friendly(&self) -> String {
        match self {
            Self::EnvironmentSync { .. } | Self::RecoveryExhausted { .. } => {
                format!("{}\n\n{}", self, DOCKER_MACHINE_REMEDIATION)
            }
            Self::CreateFailed { .. } => {
                format!(
                    "{}\n💡 Check `docker-machine ls` and the driver output above",
                    self
                )
            }
            Self::Command(CommandError::Spawn { .. }) => {
                format!("{}\n💡 Is docker-machine installed and on your PATH?", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HypervisorError>;
