use assert_cmd::prelude::*;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Stand-in for docker-machine answering from canned output.
#[cfg(unix)]
const FAKE_DOCKER_MACHINE: &str = r#"#!/bin/sh
case "$1" in
  ls)
    printf 'NAME ACTIVE DRIVER STATE\ndefault - virtualbox Stopped\ngolem * virtualbox Running\n'
    ;;
  status)
    echo Running
    ;;
  env)
    printf 'SET DOCKER_HOST=tcp://192.168.99.100:2376\nSET DOCKER_CERT_PATH="/certs/machines/golem"\nREM configure your shell\n'
    ;;
  *)
    echo "unexpected: $*" >&2
    exit 1
    ;;
esac
"#;

fn vm_host(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("vm-host")?;
    cmd.current_dir(dir).env("LOG_OUTPUT", "none");
    Ok(cmd)
}

fn write_config(dir: &Path, machine_binary: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join("vm-host.yaml");
    fs::write(
        &path,
        format!("machine_binary: \"{}\"\n", machine_binary.display()),
    )?;
    Ok(path)
}

#[cfg(unix)]
fn install_fake_machine(dir: &Path) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("docker-machine");
    fs::write(&path, FAKE_DOCKER_MACHINE)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[test]
fn test_help_lists_subcommands() -> TestResult {
    let temp_dir = TempDir::new()?;
    vm_host(temp_dir.path())?
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("setup")
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("port"))
                .and(predicate::str::contains("restart")),
        );
    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> TestResult {
    let temp_dir = TempDir::new()?;
    vm_host(temp_dir.path())?
        .args(["--config", "does-not-exist.yaml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.yaml"));
    Ok(())
}

#[test]
fn test_invalid_driver_fails() -> TestResult {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("vm-host.yaml"), "driver: parallels\n")?;
    vm_host(temp_dir.path())?
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown driver"));
    Ok(())
}

#[test]
fn test_missing_docker_machine_is_reported() -> TestResult {
    let temp_dir = TempDir::new()?;
    let config = write_config(temp_dir.path(), Path::new("definitely-not-docker-machine"))?;
    vm_host(temp_dir.path())?
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency not found"));
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn test_list_and_status_with_fake_machine() -> TestResult {
    let temp_dir = TempDir::new()?;
    let machine = install_fake_machine(temp_dir.path())?;
    write_config(temp_dir.path(), &machine)?;

    vm_host(temp_dir.path())?
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* golem").and(predicate::str::contains("  default")));

    vm_host(temp_dir.path())?
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("golem: Running"));
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn test_env_prints_synced_variables() -> TestResult {
    let temp_dir = TempDir::new()?;
    let machine = install_fake_machine(temp_dir.path())?;
    write_config(temp_dir.path(), &machine)?;

    vm_host(temp_dir.path())?
        .arg("env")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("DOCKER_HOST=tcp://192.168.99.100:2376")
                .and(predicate::str::contains("DOCKER_CERT_PATH=/certs/machines/golem")),
        );
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn test_setup_of_running_vm() -> TestResult {
    let temp_dir = TempDir::new()?;
    let machine = install_fake_machine(temp_dir.path())?;
    write_config(temp_dir.path(), &machine)?;

    vm_host(temp_dir.path())?
        .arg("setup")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("VM 'golem' is ready")
                .and(predicate::str::contains("/certs/machines")),
        );
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn test_default_config_finds_docker_machine_on_path() -> TestResult {
    let temp_dir = TempDir::new()?;
    let tools_dir = temp_dir.path().join("bin");
    fs::create_dir_all(&tools_dir)?;
    install_fake_machine(&tools_dir)?;

    let mut dirs = vec![tools_dir];
    if let Some(path) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path));
    }

    vm_host(temp_dir.path())?
        .env("PATH", std::env::join_paths(dirs)?)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("golem: Running"));
    Ok(())
}
