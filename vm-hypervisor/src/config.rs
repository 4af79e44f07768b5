//! Configuration for the managed docker-machine VM.
//!
//! Loaded from YAML. Every field has a default so an empty (or missing)
//! file describes the stock single-VM setup.

use crate::driver::{Driver, CONSTRAINT_KEYS};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vm_core::error::{Result, VmError};

/// Name of the single VM managed per process.
pub const DEFAULT_VM_NAME: &str = "golem";
/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "vm-host.yaml";

const DEFAULT_MACHINE_BINARY: &str = "docker-machine";
const DEFAULT_DOCKER_BINARY: &str = "docker";
const REGENERATE_CERTS_TIMEOUT_SECS: u64 = 120;
const RESTART_VM_TIMEOUT_SECS: u64 = 120;

/// Named parameters handed to `create`: sizing constraints plus
/// driver-specific flags, in insertion order.
pub type CreateParams = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub cpu_count: Option<u32>,
    /// Memory in MB.
    pub memory_size: Option<u64>,
    /// Disk in MB.
    pub disk_size: Option<u64>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cpu_count: Some(2),
            memory_size: Some(2048),
            disk_size: Some(20000),
        }
    }
}

/// Upper bounds for the recovery commands; nothing else is time limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub regenerate_certs_secs: u64,
    pub restart_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            regenerate_certs_secs: REGENERATE_CERTS_TIMEOUT_SECS,
            restart_secs: RESTART_VM_TIMEOUT_SECS,
        }
    }
}

impl Timeouts {
    pub fn regenerate_certs(&self) -> Duration {
        Duration::from_secs(self.regenerate_certs_secs)
    }

    pub fn restart(&self) -> Duration {
        Duration::from_secs(self.restart_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypervisorConfig {
    pub vm_name: String,
    pub driver: Driver,
    pub machine_binary: PathBuf,
    pub docker_binary: PathBuf,
    pub resources: ResourceConfig,
    /// Extra `create` flags, passed through verbatim.
    pub driver_flags: IndexMap<String, String>,
    pub timeouts: Timeouts,
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            vm_name: DEFAULT_VM_NAME.to_string(),
            driver: Driver::VirtualBox,
            machine_binary: PathBuf::from(DEFAULT_MACHINE_BINARY),
            docker_binary: PathBuf::from(DEFAULT_DOCKER_BINARY),
            resources: ResourceConfig::default(),
            driver_flags: IndexMap::new(),
            timeouts: Timeouts::default(),
        }
    }
}

impl HypervisorConfig {
    /// Load configuration from `path`, or from `vm-host.yaml` in the current
    /// directory when it exists, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            VmError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| VmError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: HypervisorConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.vm_name.trim().is_empty() {
            return Err(VmError::Config("vm_name must not be empty".into()));
        }
        if let Some(key) = self
            .driver_flags
            .keys()
            .find(|key| CONSTRAINT_KEYS.iter().any(|(_, k)| *k == key.as_str()))
        {
            return Err(VmError::Config(format!(
                "'{}' belongs under `resources`, not `driver_flags`",
                key
            )));
        }
        Ok(())
    }

    /// Parameters for a fresh `create`, in the shape the manager's
    /// configuration function is expected to return.
    pub fn create_params(&self) -> CreateParams {
        let mut params = CreateParams::new();
        let sizes = [
            ("cpu_count", self.resources.cpu_count.map(u64::from)),
            ("memory_size", self.resources.memory_size),
            ("disk_size", self.resources.disk_size),
        ];
        for (key, value) in sizes {
            if let Some(value) = value {
                params.insert(key.to_string(), value.to_string());
            }
        }
        params.extend(self.driver_flags.clone());
        params
    }
}
