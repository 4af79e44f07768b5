// Standard library
use std::ffi::OsStr;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

// External crates
use crate::error::CommandError;
use duct::cmd;
use tracing::debug;
use which::which;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn render_command<A: AsRef<OsStr>>(program: &Path, args: &[A]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}

/// Run a command to completion and return its captured standard output.
///
/// `envs` are added on top of the inherited environment. With a timeout the
/// child is polled and killed once the deadline passes; without one the call
/// blocks for as long as the tool takes.
pub fn capture_command<A, K, V>(
    program: &Path,
    args: &[A],
    envs: &[(K, V)],
    timeout: Option<Duration>,
) -> Result<String, CommandError>
where
    A: AsRef<OsStr>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let full_command = render_command(program, args);
    debug!("Running: {}", full_command);

    // A bare name like `docker-machine` must go through PATH, which duct only
    // does for string programs.
    let mut expression = cmd(program.as_os_str(), args)
        .stdout_capture()
        .stderr_capture()
        .unchecked();
    for (key, value) in envs {
        expression = expression.env(key, value);
    }

    let handle = expression.start().map_err(|source| CommandError::Spawn {
        command: full_command.clone(),
        source,
    })?;

    let output = match timeout {
        None => handle.wait().map_err(|source| CommandError::Spawn {
            command: full_command.clone(),
            source,
        })?,
        Some(limit) => {
            let start = Instant::now();
            loop {
                match handle.try_wait() {
                    Ok(Some(output)) => break output,
                    Ok(None) if start.elapsed() >= limit => {
                        let _ = handle.kill();
                        return Err(CommandError::Timeout {
                            command: full_command,
                            timeout: limit,
                            stdout: None,
                        });
                    }
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(source) => {
                        return Err(CommandError::Spawn {
                            command: full_command,
                            source,
                        })
                    }
                }
            }
        }
    };

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            command: full_command,
            code: output.status.code(),
            stdout: Some(output.stdout.clone()),
            stderr: output.stderr.clone(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Checks if a command-line tool is available in the system's PATH.
pub fn is_tool_installed<T: AsRef<OsStr>>(tool_name: T) -> bool {
    which(tool_name).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const NO_ENV: &[(&str, &str)] = &[];

    #[test]
    fn test_capture_command_returns_stdout() {
        let out = capture_command(Path::new("sh"), &["-c", "echo hello"], NO_ENV, None)
            .expect("echo should succeed");
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_capture_command_applies_extra_env() {
        let out = capture_command(
            Path::new("sh"),
            &["-c", "printf %s \"$VM_HOST_PROBE\""],
            &[("VM_HOST_PROBE", "tcp://192.168.99.100:2376")],
            None,
        )
        .expect("printf should succeed");
        assert_eq!(out, "tcp://192.168.99.100:2376");
    }

    #[test]
    fn test_capture_command_reports_non_zero_exit_with_stdout() {
        let err = capture_command(
            Path::new("sh"),
            &["-c", "echo partial; exit 3"],
            NO_ENV,
            Some(Duration::from_secs(10)),
        )
        .unwrap_err();
        match err {
            CommandError::NonZeroExit { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_capture_command_times_out() {
        let err = capture_command(
            Path::new("sh"),
            &["-c", "sleep 5"],
            NO_ENV,
            Some(Duration::from_millis(200)),
        )
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_capture_command_missing_binary_is_spawn_error() {
        let err = capture_command(
            Path::new("definitely-not-a-real-binary-vm-host"),
            &["ls"],
            NO_ENV,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[test]
    fn test_is_tool_installed() {
        assert!(is_tool_installed("sh"));
        assert!(!is_tool_installed("definitely-not-a-real-binary-vm-host"));
    }
}
