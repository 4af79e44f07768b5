use anyhow::Result;
use std::path::Path;
use vm_hypervisor::testing::{ScriptedMachine, StaticInspector};
use vm_hypervisor::MachineSubcommand::*;
use vm_hypervisor::{
    DockerMachineHypervisor, Driver, EnvironmentStore, HypervisorConfig, HypervisorError,
    InMemoryEnvironment,
};

const HYPERV_ENV: &str = "\
SET DOCKER_TLS_VERIFY=1\r
SET DOCKER_HOST=tcp://10.0.75.2:2376\r
SET DOCKER_CERT_PATH=C:\\Users\\dev\\.docker\\machine\\machines\\golem\r
SET DOCKER_MACHINE_NAME=golem\r
REM Run this command to configure your shell:\r
";

fn hyperv_manager(machine: &ScriptedMachine, inspector: StaticInspector) -> DockerMachineHypervisor {
    let config = HypervisorConfig {
        driver: Driver::HyperV,
        ..HypervisorConfig::default()
    };
    let params_config = config.clone();
    DockerMachineHypervisor::new(config.driver, machine.clone(), inspector, move || {
        params_config.create_params()
    })
    .with_vm_name(&config.vm_name)
    .with_env_store(InMemoryEnvironment::new())
}

#[test]
fn test_fresh_host_is_created_started_and_synced() -> Result<()> {
    let machine = ScriptedMachine::new();
    machine
        .respond(List, "NAME ACTIVE DRIVER STATE\n")
        .respond(Status, "Stopped\n")
        .respond(Env, HYPERV_ENV)
        .respond(Ip, "10.0.75.2\n");
    let inspector = StaticInspector::new().with_port("web", 80, "32770");
    let mut manager = hyperv_manager(&machine, inspector);

    manager.setup()?;

    assert_eq!(machine.subcommands(), vec![List, Create, Status, Start, Env]);
    let create = machine.last_call(Create).unwrap();
    assert_eq!(
        create.args,
        vec![
            "--driver",
            "hyperv",
            "--hyperv-cpu-count",
            "2",
            "--hyperv-memory",
            "2048",
            "--hyperv-disk-size",
            "20000",
        ]
    );
    assert_eq!(
        manager.config_dir(),
        Some(Path::new("C:\\Users\\dev\\.docker\\machine\\machines"))
    );
    assert_eq!(
        manager.env_store().var("DOCKER_HOST").as_deref(),
        Some("tcp://10.0.75.2:2376")
    );

    let (ip, port) = manager.get_port_mapping("web", 80)?;
    assert_eq!((ip.as_str(), port), ("10.0.75.2", 32770));
    Ok(())
}

#[test]
fn test_setup_heals_broken_certificates() -> Result<()> {
    let machine = ScriptedMachine::new();
    machine
        .respond(List, "NAME ACTIVE DRIVER STATE\ngolem * hyperv Running\n")
        .respond(Status, "Running\n")
        .fail_with_stdout(Env, "Error checking TLS connection: x509: certificate is valid for 10.0.75.1")
        .respond(Env, HYPERV_ENV);
    let mut manager = hyperv_manager(&machine, StaticInspector::new());

    manager.setup()?;

    assert_eq!(
        machine.subcommands(),
        vec![List, Status, Env, RegenerateCerts, Env]
    );
    assert_eq!(manager.environment().get("DOCKER_MACHINE_NAME"), Some("golem"));
    Ok(())
}

#[test]
fn test_setup_reports_unrecoverable_host() {
    let machine = ScriptedMachine::new();
    machine
        .respond(List, "NAME ACTIVE DRIVER STATE\ngolem * hyperv Error\n")
        .respond(Status, "Error\n")
        .fail(Env)
        .fail(RegenerateCerts)
        .fail(Restart)
        .fail(Remove);
    let mut manager = hyperv_manager(&machine, StaticInspector::new());

    let err = manager.setup().unwrap_err();

    assert!(matches!(err, HypervisorError::EnvironmentSync { .. }));
    assert!(err.user_friendly().contains("docker-machine ls"));
    assert_eq!(machine.count(Create), 0);
    assert_eq!(machine.count(Restart), 1);
}

#[test]
fn test_restart_with_named_vm() -> Result<()> {
    let machine = ScriptedMachine::new();
    machine.respond(Status, "Running\n").respond(Env, HYPERV_ENV);
    let mut manager = hyperv_manager(&machine, StaticInspector::new());

    let touched = manager.restart_with(Some("golem"), |manager, name| {
        Ok(format!("{}@{}", name, manager.driver()))
    })?;

    assert_eq!(touched, "golem@hyperv");
    let calls = machine.calls();
    assert!(calls
        .iter()
        .filter(|call| call.subcommand != Env)
        .all(|call| call.vm_name.as_deref() == Some("golem")));
    assert_eq!(machine.subcommands(), vec![Status, Stop, Start, Env]);
    Ok(())
}
