//! Tracing subscriber setup for the vm-host tools.
//!
//! Everything is driven by environment variables so the same binary can log
//! to the console while run interactively and to a rolling file when driven
//! by another process:
//!
//! * `LOG_LEVEL` - default filter when `RUST_LOG` is unset (`info`)
//! * `LOG_OUTPUT` - `console`, `file`, `both` or `none` (`console`)
//! * `LOG_FORMAT` - `human` or `json` (`human`)
//! * `LOG_FILE_PATH` - file used by the `file`/`both` outputs (`/tmp/vm-host.log`)

use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::MakeWriter, prelude::*, registry, EnvFilter};

const DEFAULT_LOG_FILE: &str = "/tmp/vm-host.log";

// --- Custom "Tee" Writer ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = Tee<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            "none" | "off" => LogOutput::None,
            _ => LogOutput::Console,
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub file_path: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            output: lookup("LOG_OUTPUT")
                .map(|v| LogOutput::parse(&v))
                .unwrap_or(LogOutput::Console),
            json: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }

    /// Force the `debug` level, as requested by `--debug` on the command line.
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = "debug".to_string();
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    fn file_writer(&self) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
        let log_dir = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("/tmp"));
        let log_filename = self
            .file_path
            .file_name()
            .unwrap_or_else(|| "vm-host.log".as_ref());
        let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
        tracing_appender::non_blocking(file_appender)
    }
}

fn install<W>(settings: &LogSettings, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let subscriber = registry().with(settings.env_filter());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(writer);
    // A subscriber installed earlier (tests, embedding applications) wins.
    let _ = if settings.json {
        subscriber.with(fmt_layer.json()).try_init()
    } else {
        subscriber.with(fmt_layer).try_init()
    };
}

/// Initializes the global tracing subscriber.
///
/// The returned guard must be held for as long as file logging should keep
/// flushing.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    match settings.output {
        LogOutput::Console => {
            install(settings, io::stderr);
            None
        }
        LogOutput::File => {
            let (non_blocking, guard) = settings.file_writer();
            install(settings, non_blocking);
            Some(guard)
        }
        LogOutput::Both => {
            let (non_blocking, guard) = settings.file_writer();
            let tee_writer = MakeTee {
                make_a: io::stderr,
                make_b: non_blocking,
            };
            install(settings, tee_writer);
            Some(guard)
        }
        LogOutput::None => None,
    }
}
