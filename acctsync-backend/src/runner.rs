//! Spawning the accounting tools.
//!
//! Child output never reaches the caller: it goes to a [`DiagnosticSink`],
//! either the log facade or an append-only command log. The only thing a
//! caller sees is the exit code (and stdout, for queries).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use chrono::Local;

use crate::command::display_args;
use crate::error::{io_err, BackendError};
use crate::log_rotation::rotate_command_log;

/// Where child stdout/stderr end up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiagnosticSink {
    /// Re-emit each output line at debug level.
    #[default]
    Log,
    /// Append to this file (rotated by size before each call).
    File(PathBuf),
}

/// Result of a query invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
}

/// Seam between the client and process creation; tests substitute a fake.
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Returns the exit code.
    fn run(&self, argv: &[String]) -> Result<Option<i32>, BackendError>;

    /// Run to completion, returning stdout. Stderr goes to the sink.
    fn capture(&self, argv: &[String]) -> Result<Captured, BackendError>;
}

/// Runs real processes with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    sink: DiagnosticSink,
}

impl ProcessRunner {
    pub fn new(sink: DiagnosticSink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    fn open_sink(&self, path: &Path, argv: &[String]) -> Result<File, BackendError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            }
        }
        rotate_command_log(path);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        writeln!(file, "{}: Call: {}", Local::now().to_rfc3339(), display_args(argv))
            .map_err(|e| io_err(path, e))?;
        Ok(file)
    }

    fn note_return(&self, code: Option<i32>) {
        if let DiagnosticSink::File(path) = &self.sink {
            let outcome = match code {
                Some(code) => code.to_string(),
                None => "signal".to_string(),
            };
            let appended = OpenOptions::new()
                .append(true)
                .open(path)
                .and_then(|mut f| writeln!(f, "{}: Returned: {outcome}", Local::now().to_rfc3339()));
            if let Err(err) = appended {
                tracing::warn!("could not write to command log {}: {err}", path.display());
            }
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<Option<i32>, BackendError> {
        let mut cmd = command_for(argv)?;
        let code = match &self.sink {
            DiagnosticSink::File(path) => {
                let out = self.open_sink(path, argv)?;
                let err = out.try_clone().map_err(|e| io_err(path, e))?;
                cmd.stdout(Stdio::from(out)).stderr(Stdio::from(err));
                cmd.status().map_err(|e| spawn_err(argv, e))?.code()
            }
            DiagnosticSink::Log => {
                let output = cmd.output().map_err(|e| spawn_err(argv, e))?;
                log_output(&argv[0], &output, true);
                output.status.code()
            }
        };
        self.note_return(code);
        Ok(code)
    }

    fn capture(&self, argv: &[String]) -> Result<Captured, BackendError> {
        let mut cmd = command_for(argv)?;
        cmd.stdout(Stdio::piped());
        let output = match &self.sink {
            DiagnosticSink::File(path) => {
                let err = self.open_sink(path, argv)?;
                cmd.stderr(Stdio::from(err));
                cmd.output().map_err(|e| spawn_err(argv, e))?
            }
            DiagnosticSink::Log => {
                let output = cmd.output().map_err(|e| spawn_err(argv, e))?;
                log_output(&argv[0], &output, false);
                output
            }
        };
        self.note_return(output.status.code());
        Ok(Captured {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

fn command_for(argv: &[String]) -> Result<Command, BackendError> {
    let (program, rest) = argv.split_first().ok_or(BackendError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(rest).stdin(Stdio::null());
    Ok(cmd)
}

fn spawn_err(argv: &[String], source: std::io::Error) -> BackendError {
    BackendError::Spawn {
        program: argv.first().cloned().unwrap_or_default(),
        source,
    }
}

fn log_output(program: &str, output: &Output, include_stdout: bool) {
    if include_stdout {
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("{program} stdout: {line}");
        }
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        tracing::debug!("{program} stderr: {line}");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn run_reports_exit_code() {
        let runner = ProcessRunner::default();
        assert_eq!(runner.run(&sh("exit 0")).unwrap(), Some(0));
        assert_eq!(runner.run(&sh("exit 74")).unwrap(), Some(74));
    }

    #[test]
    fn capture_returns_stdout_only() {
        let runner = ProcessRunner::default();
        let captured = runner
            .capture(&sh("echo 'Name|Active'; echo noise >&2"))
            .unwrap();
        assert_eq!(captured.code, Some(0));
        assert_eq!(captured.stdout, "Name|Active\n");
    }

    #[test]
    fn file_sink_receives_child_output_and_call_lines() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("logs").join("commands.log");
        let runner = ProcessRunner::new(DiagnosticSink::File(log.clone()));

        runner.run(&sh("echo created; echo warned >&2")).unwrap();
        let captured = runner.capture(&sh("echo row; echo oops >&2; exit 2")).unwrap();
        assert_eq!(captured.code, Some(2));
        assert_eq!(captured.stdout, "row\n");

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("Call: /bin/sh -c"));
        assert!(contents.contains("created"));
        assert!(contents.contains("warned"));
        assert!(contents.contains("oops"));
        assert!(!contents.contains("row\n"), "query stdout belongs to the caller");
        assert!(contents.contains("Returned: 2"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(&["/nonexistent/acctsync-tool".to_string()])
            .unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[test]
    fn empty_argv_is_rejected() {
        let runner = ProcessRunner::default();
        assert!(matches!(runner.run(&[]), Err(BackendError::EmptyCommand)));
    }
}
