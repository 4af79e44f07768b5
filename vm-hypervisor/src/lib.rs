//! docker-machine backed container host management.
//!
//! This library keeps one docker-machine VM available for running containers:
//! it creates the VM on demand, keeps it running, exports the docker client
//! environment for it and repairs the VM when that export stops working.

// Public modules
pub mod config;
pub mod container;
pub mod docker_machine;
pub mod driver;
pub mod env;
pub mod error;
pub mod machine;
pub mod recovery;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export common types for convenience
pub use config::{CreateParams, HypervisorConfig, ResourceConfig, Timeouts};
pub use container::{ContainerDetails, ContainerInspector, DockerCliInspector};
pub use docker_machine::{DockerMachineHypervisor, SyncAttempt};
pub use driver::{Constraints, Driver};
pub use env::{EnvSnapshot, EnvironmentStore, InMemoryEnvironment, ProcessEnvironment};
pub use error::{HypervisorError, Result};
pub use machine::{DockerMachineCli, MachineCommand, MachineSubcommand};
pub use recovery::{Recovery, RecoveryStage};
