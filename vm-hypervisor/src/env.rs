//! Environment export parsing and storage.
//!
//! `docker-machine env --shell cmd` prints `SET VAR=value` lines together
//! with `REM` usage hints. Only the assignments are kept.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Variable whose value points at the client certificate of the VM.
pub const DOCKER_CERT_PATH: &str = "DOCKER_CERT_PATH";

/// Ordered `VAR -> value` pairs exported by the driver tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: IndexMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the output of `env --shell cmd`.
    pub fn parse(output: &str) -> Self {
        let mut snapshot = Self::new();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, assignment)) = line.split_once(' ') else {
                continue;
            };
            if !directive.eq_ignore_ascii_case("set") {
                continue;
            }
            match assignment.trim().split_once('=') {
                Some((var, value)) => snapshot.insert(var.trim(), strip_quotes(value)),
                None => debug!("Ignoring env line without assignment: {}", line),
            }
        }
        snapshot
    }

    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(var.into(), value.into());
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.vars.get(var).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Overlay `other`, overwriting keys present in both. Nothing is removed.
    pub fn merge(&mut self, other: &EnvSnapshot) {
        for (var, value) in other.iter() {
            self.insert(var, value);
        }
    }

    /// Directory holding the client certificates, when the export carried one.
    pub fn cert_dir(&self) -> Option<PathBuf> {
        self.get(DOCKER_CERT_PATH).map(cert_dir_from)
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Drop the final segment of a certificate path.
///
/// Windows hosts report backslash separated paths, so both separators count.
pub fn cert_dir_from(cert_path: &str) -> PathBuf {
    let cert_path = strip_quotes(cert_path);
    match cert_path.rfind(['/', '\\']) {
        Some(idx) => PathBuf::from(&cert_path[..idx]),
        None => PathBuf::new(),
    }
}

/// Where synced variables are written.
pub trait EnvironmentStore {
    fn set_var(&mut self, key: &str, value: &str);
    fn var(&self, key: &str) -> Option<String>;

    fn apply(&mut self, snapshot: &EnvSnapshot) {
        for (key, value) in snapshot.iter() {
            self.set_var(key, value);
        }
    }
}

/// The real process environment, so child `docker` invocations see the VM.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentStore for ProcessEnvironment {
    fn set_var(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
    }

    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// An environment that lives only inside the manager.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEnvironment {
    vars: HashMap<String, String>,
}

impl InMemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvironmentStore for InMemoryEnvironment {
    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const WINDOWS_OUTPUT: &str = "\
SET DOCKER_TLS_VERIFY=1\r
SET DOCKER_HOST=tcp://192.168.99.100:2376\r
SET DOCKER_CERT_PATH=C:\\Users\\golem\\.docker\\machine\\machines\\golem\r
SET DOCKER_MACHINE_NAME=golem\r
SET COMPOSE_CONVERT_WINDOWS_PATHS=true\r
REM Run this command to configure your shell: \r
REM     @FOR /f \"tokens=*\" %i IN ('docker-machine env --shell cmd golem') DO @%i\r
";

    #[test]
    fn test_parse_windows_cmd_output() {
        let snapshot = EnvSnapshot::parse(WINDOWS_OUTPUT);
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.get("DOCKER_HOST"), Some("tcp://192.168.99.100:2376"));
        assert_eq!(
            snapshot.cert_dir(),
            Some(PathBuf::from("C:\\Users\\golem\\.docker\\machine\\machines"))
        );
    }

    #[test]
    fn test_parse_strips_quotes_and_derives_cert_dir() {
        let snapshot = EnvSnapshot::parse("set DOCKER_CERT_PATH=\"/a/b/c\"\n");
        assert_eq!(snapshot.get(DOCKER_CERT_PATH), Some("/a/b/c"));
        assert_eq!(snapshot.cert_dir(), Some(PathBuf::from("/a/b")));
    }

    #[test]
    fn test_parse_ignores_non_set_lines() {
        let output = "export DOCKER_HOST=tcp://1.2.3.4:2376\nREM set nothing\nSeT FOO=bar\nsetx BAZ=1\n";
        let snapshot = EnvSnapshot::parse(output);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("FOO"), Some("bar"));
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let snapshot = EnvSnapshot::parse("set OPTS=a=b\n");
        assert_eq!(snapshot.get("OPTS"), Some("a=b"));
    }

    #[test]
    fn test_merge_is_additive() {
        let mut base = EnvSnapshot::parse("set A=1\nset B=2\n");
        base.merge(&EnvSnapshot::parse("set B=3\nset C=4\n"));
        let pairs: Vec<(&str, &str)> = base.iter().collect();
        assert_eq!(pairs, vec![("A", "1"), ("B", "3"), ("C", "4")]);
    }

    #[test]
    fn test_cert_dir_without_separator() {
        assert_eq!(cert_dir_from("golem"), PathBuf::new());
    }

    #[test]
    fn test_in_memory_store_apply() {
        let mut store = InMemoryEnvironment::new();
        store.apply(&EnvSnapshot::parse("set DOCKER_TLS_VERIFY=1\n"));
        assert_eq!(store.var("DOCKER_TLS_VERIFY").as_deref(), Some("1"));
        assert_eq!(store.var("DOCKER_HOST"), None);
    }

    #[test]
    #[serial]
    fn test_process_store_writes_process_environment() {
        let mut store = ProcessEnvironment;
        store.set_var("VM_HOST_TEST_DOCKER_HOST", "tcp://192.168.99.100:2376");
        assert_eq!(
            env::var("VM_HOST_TEST_DOCKER_HOST").as_deref(),
            Ok("tcp://192.168.99.100:2376")
        );
        env::remove_var("VM_HOST_TEST_DOCKER_HOST");
    }
}
