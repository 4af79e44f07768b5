//! Virtualization backends understood by docker-machine.
//!
//! The backend only changes how `create` is invoked: the driver selector and
//! the driver-prefixed sizing flags. Everything else about the VM lifecycle is
//! shared.

use crate::config::CreateParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DRIVER_PARAM_NAME: &str = "--driver";

/// Logical hardware sizing knobs accepted by every driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKey {
    Cpu,
    Memory,
    Disk,
}

/// Translation from logical constraints to the keys produced by the
/// configuration function.
pub const CONSTRAINT_KEYS: &[(ConstraintKey, &str)] = &[
    (ConstraintKey::Cpu, "cpu_count"),
    (ConstraintKey::Memory, "memory_size"),
    (ConstraintKey::Disk, "disk_size"),
];

/// Sizing values pulled out of the create parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub disk: Option<String>,
}

impl Constraints {
    /// Remove every well-known constraint key from `params`.
    ///
    /// Whatever is left in `params` afterwards is a driver-specific flag.
    pub fn extract(params: &mut CreateParams) -> Self {
        let mut constraints = Constraints::default();
        for (key, config_key) in CONSTRAINT_KEYS {
            let value = params.shift_remove(*config_key);
            match key {
                ConstraintKey::Cpu => constraints.cpu = value,
                ConstraintKey::Memory => constraints.memory = value,
                ConstraintKey::Disk => constraints.disk = value,
            }
        }
        constraints
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Driver {
    VirtualBox,
    HyperV,
}

impl Driver {
    /// Name docker-machine uses for the driver, also the prefix of its flags.
    pub fn name(&self) -> &'static str {
        match self {
            Driver::VirtualBox => "virtualbox",
            Driver::HyperV => "hyperv",
        }
    }

    fn flag(&self, suffix: &str) -> String {
        format!("--{}-{}", self.name(), suffix)
    }

    /// Build the argument list for `docker-machine create`.
    ///
    /// Order: driver selector, translated constraints, then pass-through
    /// flags exactly as given (a flag with an empty value is a switch).
    pub fn create_args(&self, constraints: &Constraints, flags: &CreateParams) -> Vec<String> {
        let mut args = vec![DRIVER_PARAM_NAME.to_string(), self.name().to_string()];

        let sized = [
            (&constraints.cpu, "cpu-count"),
            (&constraints.memory, "memory"),
            (&constraints.disk, "disk-size"),
        ];
        for (value, suffix) in sized {
            if let Some(value) = value {
                args.push(self.flag(suffix));
                args.push(value.clone());
            }
        }

        for (flag, value) in flags {
            args.push(flag.clone());
            if !value.is_empty() {
                args.push(value.clone());
            }
        }

        args
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtualbox" | "vbox" => Ok(Driver::VirtualBox),
            "hyperv" | "hyper-v" => Ok(Driver::HyperV),
            other => Err(format!(
                "Unknown driver: '{}' (expected 'virtualbox' or 'hyperv')",
                other
            )),
        }
    }
}

impl TryFrom<String> for Driver {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Driver> for String {
    fn from(driver: Driver) -> Self {
        driver.name().to_string()
    }
}
