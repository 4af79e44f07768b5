//! docker-machine invocation and output parsing.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vm_core::command_stream::{capture_command, is_tool_installed};
use vm_core::error::{Result as VmResult, VmError};
use vm_core::CommandError;

/// The docker-machine subcommands the manager relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineSubcommand {
    Create,
    Env,
    Ip,
    List,
    RegenerateCerts,
    Restart,
    Remove,
    Start,
    Stop,
    Status,
}

impl MachineSubcommand {
    /// Leading command-line tokens for the subcommand.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            MachineSubcommand::Create => &["create"],
            MachineSubcommand::Env => &["env"],
            MachineSubcommand::Ip => &["ip"],
            // Never `ls -q`: it leaves out VMs in an error state.
            MachineSubcommand::List => &["ls"],
            MachineSubcommand::RegenerateCerts => &["regenerate-certs", "--force"],
            MachineSubcommand::Restart => &["restart"],
            MachineSubcommand::Remove => &["rm", "-f", "-y"],
            MachineSubcommand::Start => &["start"],
            MachineSubcommand::Stop => &["stop"],
            MachineSubcommand::Status => &["status"],
        }
    }
}

impl fmt::Display for MachineSubcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tokens()[0])
    }
}

/// Runs docker-machine subcommands and hands back their standard output.
pub trait MachineCommand {
    fn run(
        &self,
        subcommand: MachineSubcommand,
        vm_name: Option<&str>,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, CommandError>;
}

/// Full argument vector: subcommand tokens, extra args, then the VM name.
pub fn command_line(
    subcommand: MachineSubcommand,
    vm_name: Option<&str>,
    args: &[String],
) -> Vec<String> {
    let mut line: Vec<String> = subcommand.tokens().iter().map(|t| t.to_string()).collect();
    line.extend(args.iter().cloned());
    if let Some(name) = vm_name {
        line.push(name.to_string());
    }
    line
}

/// The real `docker-machine` executable.
#[derive(Debug, Clone)]
pub struct DockerMachineCli {
    binary: PathBuf,
}

impl DockerMachineCli {
    pub fn new(binary: impl Into<PathBuf>) -> VmResult<Self> {
        let binary = binary.into();
        if !is_tool_installed(&binary) {
            return Err(VmError::Dependency(binary.display().to_string()));
        }
        Ok(Self { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl MachineCommand for DockerMachineCli {
    fn run(
        &self,
        subcommand: MachineSubcommand,
        vm_name: Option<&str>,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, CommandError> {
        let line = command_line(subcommand, vm_name, args);
        let no_env: &[(&str, &str)] = &[];
        capture_command(&self.binary, line.as_slice(), no_env, timeout)
    }
}

/// VM names from `docker-machine ls` output.
///
/// The first line is the header and the last one the trailing blank; the
/// name is the first column of every line in between.
pub fn parse_vm_list(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.split('\n').collect();
    if lines.len() < 2 {
        return Vec::new();
    }
    lines[1..lines.len() - 1]
        .iter()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// First line of `docker-machine ip` output that is an IP literal.
///
/// Lines that don't start with a digit (warnings, banners) are skipped.
pub fn parse_ip(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(|c: char| c.is_ascii_digit()))
        .find(|line| {
            let valid = line.parse::<IpAddr>().is_ok();
            if !valid {
                debug!("Skipping non-IP line from `ip`: {}", line);
            }
            valid
        })
        .map(str::to_string)
}
