//! Container lookups against the docker daemon running inside the VM.

use crate::env::EnvSnapshot;
use crate::error::{HypervisorError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use vm_core::command_stream::capture_command;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkSettings {
    /// `"<port>/<proto>"` to host bindings; unpublished ports map to `null`.
    #[serde(rename = "Ports", default)]
    pub ports: HashMap<String, Option<Vec<PortBinding>>>,
}

/// The part of `docker inspect` output this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerDetails {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
}

impl ContainerDetails {
    /// Host port bound to `port/tcp`, taken from the first binding.
    pub fn tcp_host_port(&self, port: u16) -> Option<&str> {
        self.network_settings
            .ports
            .get(&format!("{}/tcp", port))?
            .as_ref()?
            .first()
            .map(|binding| binding.host_port.as_str())
    }
}

pub trait ContainerInspector {
    /// Inspect a container, talking to the daemon described by `env`.
    fn inspect_container(&self, container_id: &str, env: &EnvSnapshot) -> Result<ContainerDetails>;
}

/// `docker inspect` through the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCliInspector {
    binary: PathBuf,
}

impl DockerCliInspector {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ContainerInspector for DockerCliInspector {
    fn inspect_container(&self, container_id: &str, env: &EnvSnapshot) -> Result<ContainerDetails> {
        let envs: Vec<(&str, &str)> = env.iter().collect();
        let output = capture_command(&self.binary, &["inspect", container_id], envs.as_slice(), None)?;
        parse_inspect_output(container_id, &output)
    }
}

fn parse_inspect_output(container_id: &str, output: &str) -> Result<ContainerDetails> {
    let mut containers: Vec<ContainerDetails> = serde_json::from_str(output).map_err(|e| {
        HypervisorError::Inspect(format!("invalid inspect JSON for '{}': {}", container_id, e))
    })?;
    if containers.is_empty() {
        return Err(HypervisorError::Inspect(format!(
            "no such container: {}",
            container_id
        )));
    }
    Ok(containers.swap_remove(0))
}
