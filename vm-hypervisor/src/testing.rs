//! Scripted stand-ins for docker-machine and the docker daemon.
//!
//! Available to this crate's tests and, with the `test-helpers` feature, to
//! downstream crates.

use crate::container::{ContainerDetails, ContainerInspector, PortBinding};
use crate::env::EnvSnapshot;
use crate::error::{HypervisorError, Result};
use crate::machine::{command_line, MachineCommand, MachineSubcommand};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use vm_core::CommandError;

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Exit { stdout: Option<String> },
    Timeout,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub subcommand: MachineSubcommand,
    pub vm_name: Option<String>,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<MachineSubcommand, VecDeque<Reply>>,
    calls: Vec<RecordedCall>,
}

/// A [`MachineCommand`] that replays queued replies per subcommand.
///
/// Replies are consumed in order; the last one queued for a subcommand keeps
/// being returned. Unscripted subcommands succeed with empty output. Clones
/// share the script, so a test keeps one handle and gives one to the manager.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMachine {
    script: Rc<RefCell<Script>>,
}

impl ScriptedMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, subcommand: MachineSubcommand, reply: Reply) -> &Self {
        self.script
            .borrow_mut()
            .replies
            .entry(subcommand)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn respond(&self, subcommand: MachineSubcommand, output: &str) -> &Self {
        self.push(subcommand, Reply::Output(output.to_string()))
    }

    pub fn fail(&self, subcommand: MachineSubcommand) -> &Self {
        self.push(subcommand, Reply::Exit { stdout: None })
    }

    pub fn fail_with_stdout(&self, subcommand: MachineSubcommand, stdout: &str) -> &Self {
        self.push(
            subcommand,
            Reply::Exit {
                stdout: Some(stdout.to_string()),
            },
        )
    }

    pub fn time_out(&self, subcommand: MachineSubcommand) -> &Self {
        self.push(subcommand, Reply::Timeout)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.borrow().calls.clone()
    }

    pub fn subcommands(&self) -> Vec<MachineSubcommand> {
        self.script
            .borrow()
            .calls
            .iter()
            .map(|call| call.subcommand)
            .collect()
    }

    pub fn count(&self, subcommand: MachineSubcommand) -> usize {
        self.script
            .borrow()
            .calls
            .iter()
            .filter(|call| call.subcommand == subcommand)
            .count()
    }

    pub fn last_call(&self, subcommand: MachineSubcommand) -> Option<RecordedCall> {
        self.script
            .borrow()
            .calls
            .iter()
            .rev()
            .find(|call| call.subcommand == subcommand)
            .cloned()
    }
}

impl MachineCommand for ScriptedMachine {
    fn run(
        &self,
        subcommand: MachineSubcommand,
        vm_name: Option<&str>,
        args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<String, CommandError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(RecordedCall {
            subcommand,
            vm_name: vm_name.map(str::to_string),
            args: args.to_vec(),
            timeout,
        });

        let reply = match script.replies.get_mut(&subcommand) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        let command = format!(
            "docker-machine {}",
            command_line(subcommand, vm_name, args).join(" ")
        );
        match reply {
            None => Ok(String::new()),
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Exit { stdout }) => Err(CommandError::NonZeroExit {
                command,
                code: Some(1),
                stdout: stdout.map(String::into_bytes),
                stderr: Vec::new(),
            }),
            Some(Reply::Timeout) => Err(CommandError::Timeout {
                command,
                timeout: timeout.unwrap_or_default(),
                stdout: None,
            }),
        }
    }
}

/// A [`ContainerInspector`] backed by a fixed table of containers.
#[derive(Debug, Clone, Default)]
pub struct StaticInspector {
    containers: HashMap<String, ContainerDetails>,
    seen_env: Rc<RefCell<Vec<EnvSnapshot>>>,
}

impl StaticInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `port/tcp` of `container_id` on `host_port`.
    pub fn with_port(mut self, container_id: &str, port: u16, host_port: &str) -> Self {
        let details = self
            .containers
            .entry(container_id.to_string())
            .or_insert_with(|| ContainerDetails {
                id: container_id.to_string(),
                ..Default::default()
            });
        details.network_settings.ports.insert(
            format!("{}/tcp", port),
            Some(vec![PortBinding {
                host_ip: "0.0.0.0".to_string(),
                host_port: host_port.to_string(),
            }]),
        );
        self
    }

    /// Environments the inspector was called with, oldest first.
    pub fn seen_env(&self) -> Vec<EnvSnapshot> {
        self.seen_env.borrow().clone()
    }
}

impl ContainerInspector for StaticInspector {
    fn inspect_container(&self, container_id: &str, env: &EnvSnapshot) -> Result<ContainerDetails> {
        self.seen_env.borrow_mut().push(env.clone());
        self.containers
            .get(container_id)
            .cloned()
            .ok_or_else(|| HypervisorError::Inspect(format!("no such container: {}", container_id)))
    }
}
