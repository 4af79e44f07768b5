use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    Config(String),
    Dependency(String),
    Serialization(String),
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            VmError::Config(s) => write!(f, "Configuration error: {}", s),
            VmError::Dependency(s) => {
                write!(f, "Dependency not found: {}\n\n", s)?;
                write!(f, "Fix:\n")?;
                write!(f, "  • Install {} and make sure it is on your PATH\n", s)?;
                write!(f, "  • Or point `machine_binary` in vm-host.yaml at it")
            }
            VmError::Serialization(s) => write!(f, "Serialization error: {}", s),
        }
    }
}

impl From<serde_yaml_ng::Error> for VmError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        VmError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VmError>;

/// Failure of an external command whose output was being captured.
///
/// Non-zero exits and timeouts are ordinary outcomes for the tools driven
/// here, so callers usually inspect the variant rather than bubbling it up.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {}", display_code(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stdout: Option<Vec<u8>>,
        stderr: Vec<u8>,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout {
        command: String,
        timeout: Duration,
        stdout: Option<Vec<u8>>,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

impl CommandError {
    /// The full command line that failed.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Spawn { command, .. }
            | CommandError::NonZeroExit { command, .. }
            | CommandError::Timeout { command, .. } => command,
        }
    }

    /// Captured standard output, if the process got far enough to produce any.
    pub fn stdout(&self) -> Option<&[u8]> {
        match self {
            CommandError::Spawn { .. } => None,
            CommandError::NonZeroExit { stdout, .. } | CommandError::Timeout { stdout, .. } => {
                stdout.as_deref()
            }
        }
    }

    /// Captured standard output decoded as UTF-8, or an empty string when unavailable.
    pub fn stdout_text(&self) -> String {
        self.stdout()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_text_decodes_captured_output() {
        let err = CommandError::NonZeroExit {
            command: "docker-machine create golem".into(),
            code: Some(1),
            stdout: Some(b"Error with pre-create check".to_vec()),
            stderr: Vec::new(),
        };
        assert_eq!(err.stdout_text(), "Error with pre-create check");
        assert_eq!(
            err.to_string(),
            "`docker-machine create golem` exited with status 1"
        );
    }

    #[test]
    fn test_stdout_text_empty_when_unavailable() {
        let err = CommandError::Timeout {
            command: "docker-machine restart golem".into(),
            timeout: Duration::from_secs(120),
            stdout: None,
        };
        assert_eq!(err.stdout_text(), "");
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out after 120s"));
    }

    #[test]
    fn test_spawn_error_has_no_stdout() {
        let err = CommandError::Spawn {
            command: "missing-tool ls".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.stdout().is_none());
        assert_eq!(err.command(), "missing-tool ls");
    }

    #[test]
    fn test_dependency_error_includes_fix() {
        let msg = VmError::Dependency("docker-machine".into()).to_string();
        assert!(msg.starts_with("Dependency not found: docker-machine"));
        assert!(msg.contains("Fix:"));
    }
}
