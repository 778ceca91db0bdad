//! Backend Client and Tabular Reader over one tool installation.
//!
//! `execute` spawns exactly one process per command and maps its exit code
//! to success, ignored, or [`BackendError::ExternalTool`]. There are no
//! retries: the first failure propagates to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::command::{display_args, BackendCommand, Invocation};
use crate::error::BackendError;
use crate::runner::CommandRunner;
use crate::tabular::{self, BackendRecord, ParseOptions};

/// What to do when a query prints no header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Existence checks and listings: no output means nothing found.
    AbsentIsEmpty,
    /// The caller will act on the rows; a missing header is a hard failure.
    Required,
}

/// Successful outcome of [`Client::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    Succeeded,
    /// Non-zero exit listed in the command's ignorable set.
    Ignored(i32),
}

pub struct Client {
    name: String,
    invocation: Invocation,
    runner: Arc<dyn CommandRunner>,
    parse: ParseOptions,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        invocation: Invocation,
        runner: Arc<dyn CommandRunner>,
        parse: ParseOptions,
    ) -> Self {
        Self {
            name: name.into(),
            invocation,
            runner,
            parse,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Run a mutating command.
    pub fn execute(&self, command: &BackendCommand) -> Result<ExecOutcome, BackendError> {
        if command.args.is_empty() {
            return Err(BackendError::EmptyCommand);
        }
        let argv = self.invocation.argv(&command.args);
        tracing::debug!("[{}] cmd {}", self.name, display_args(&argv));

        let code = self.runner.run(&argv)?;
        match code {
            Some(0) => {
                tracing::debug!("[{}] <-- returned 0 (good)", self.name);
                Ok(ExecOutcome::Succeeded)
            }
            Some(code) if command.is_ignorable(code) => {
                tracing::debug!("[{}] <-- `{command}` returned {code} (ignored)", self.name);
                Ok(ExecOutcome::Ignored(code))
            }
            code => {
                tracing::error!("[{}] <-- `{command}` returned {code:?} (error)", self.name);
                Err(BackendError::ExternalTool {
                    command: command.to_string(),
                    code,
                })
            }
        }
    }

    /// Run a read-only query and parse its pipe-delimited output.
    pub fn query(
        &self,
        args: &[String],
        policy: HeaderPolicy,
    ) -> Result<Vec<BackendRecord>, BackendError> {
        let argv = self.invocation.argv(args);
        let shown = display_args(args);
        tracing::debug!("[{}] query {}", self.name, display_args(&argv));

        let captured = self.runner.capture(&argv)?;
        if captured.code != Some(0) {
            tracing::error!(
                "[{}] <-- query `{shown}` returned {:?} (error)",
                self.name,
                captured.code
            );
            return Err(BackendError::ExternalTool {
                command: shown,
                code: captured.code,
            });
        }

        let table = tabular::parse(&captured.stdout, self.parse)?;
        if !table.has_headers() {
            return match policy {
                HeaderPolicy::AbsentIsEmpty => {
                    tracing::debug!("[{}] query `{shown}` returned no headers", self.name);
                    Ok(vec![])
                }
                HeaderPolicy::Required => Err(BackendError::MissingHeaders { command: shown }),
            };
        }
        tracing::debug!("[{}] <-- {} row(s)", self.name, table.rows.len());
        Ok(table.rows)
    }

    /// Run a listing query and key it by lowercased first column.
    pub fn query_keyed(
        &self,
        args: &[String],
        policy: HeaderPolicy,
    ) -> Result<BTreeMap<String, BackendRecord>, BackendError> {
        let rows = self.query(args, policy)?;
        tabular::Table {
            headers: vec![],
            rows,
        }
        .into_keyed()
    }

    /// Fetch at most one record named `key`, checked against `key_field`.
    pub fn lookup_one(
        &self,
        args: &[String],
        key: &str,
        key_field: &str,
    ) -> Result<Option<BackendRecord>, BackendError> {
        let mut records = self.query(args, HeaderPolicy::AbsentIsEmpty)?;
        match records.len() {
            0 => return Ok(None),
            1 => {}
            count => {
                tracing::error!("[{}] query returned {count} results for '{key}'", self.name);
                return Err(BackendError::AmbiguousRecord {
                    key: key.to_string(),
                    count,
                });
            }
        }

        let record = records.remove(0);
        let actual = record.require(key_field, &display_args(args))?;
        if actual.to_lowercase() != key.to_lowercase() {
            tracing::error!("[{}] expected '{key}' but got '{actual}'", self.name);
            return Err(BackendError::IdentityMismatch {
                expected: key.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::command::ToolLayout;
    use crate::runner::Captured;

    /// Replays canned results and records every argv it was given.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub exit_codes: Mutex<Vec<Option<i32>>>,
        pub outputs: Mutex<Vec<Captured>>,
    }

    impl ScriptedRunner {
        pub fn with_outputs(outputs: &[&str]) -> Self {
            let runner = Self::default();
            *runner.outputs.lock().unwrap() = outputs
                .iter()
                .map(|out| Captured {
                    code: Some(0),
                    stdout: out.to_string(),
                })
                .collect();
            runner
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, argv: &[String]) -> Result<Option<i32>, BackendError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            let mut codes = self.exit_codes.lock().unwrap();
            Ok(if codes.is_empty() { Some(0) } else { codes.remove(0) })
        }

        fn capture(&self, argv: &[String]) -> Result<Captured, BackendError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            let mut outputs = self.outputs.lock().unwrap();
            Ok(if outputs.is_empty() {
                Captured {
                    code: Some(0),
                    stdout: String::new(),
                }
            } else {
                outputs.remove(0)
            })
        }
    }

    fn client(runner: Arc<ScriptedRunner>) -> Client {
        Client::new(
            "gold",
            Invocation::new(vec![], ToolLayout::BinDir(PathBuf::from("/g"))),
            runner,
            ParseOptions::default(),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn execute_maps_exit_codes() {
        let runner = Arc::new(ScriptedRunner::default());
        *runner.exit_codes.lock().unwrap() = vec![Some(0), Some(8), Some(8), None];
        let c = client(runner.clone());
        let rm = BackendCommand::new(["grmuser", "-u", "alice"]).ignoring(&[8]);
        let plain = BackendCommand::new(["grmuser", "-u", "alice"]);

        assert_eq!(c.execute(&rm).unwrap(), ExecOutcome::Succeeded);
        assert_eq!(c.execute(&rm).unwrap(), ExecOutcome::Ignored(8));
        match c.execute(&plain) {
            Err(BackendError::ExternalTool { command, code }) => {
                assert_eq!(command, "grmuser -u alice");
                assert_eq!(code, Some(8));
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
        assert!(matches!(
            c.execute(&rm),
            Err(BackendError::ExternalTool { code: None, .. })
        ));
        assert_eq!(runner.calls()[0], args(&["/g/grmuser", "-u", "alice"]));
    }

    #[test]
    fn query_failure_is_external_tool_error() {
        let runner = Arc::new(ScriptedRunner::default());
        runner.outputs.lock().unwrap().push(Captured {
            code: Some(1),
            stdout: "Name\n".into(),
        });
        let err = client(runner)
            .query(&args(&["glsuser", "--raw"]), HeaderPolicy::AbsentIsEmpty)
            .unwrap_err();
        assert!(matches!(err, BackendError::ExternalTool { code: Some(1), .. }));
    }

    #[test]
    fn missing_headers_follow_policy() {
        let runner = Arc::new(ScriptedRunner::with_outputs(&["", ""]));
        let c = client(runner);
        let q = args(&["gbalance", "-u", "alice", "--raw"]);
        assert!(c.query(&q, HeaderPolicy::AbsentIsEmpty).unwrap().is_empty());
        assert!(matches!(
            c.query(&q, HeaderPolicy::Required),
            Err(BackendError::MissingHeaders { .. })
        ));
    }

    #[test]
    fn lookup_one_checks_count_and_identity() {
        let runner = Arc::new(ScriptedRunner::with_outputs(&[
            "Name|Active\nAlice|True\n",
            "Name|Active\nalice|True\nalice2|True\n",
            "Name|Active\nmallory|True\n",
            "Active\nTrue\n",
        ]));
        let c = client(runner);
        let q = args(&["glsuser", "-u", "alice", "--raw"]);

        let found = c.lookup_one(&q, "alice", "Name").unwrap().expect("record");
        assert_eq!(found.get("Name"), Some("Alice"));
        assert!(matches!(
            c.lookup_one(&q, "alice", "Name"),
            Err(BackendError::AmbiguousRecord { count: 2, .. })
        ));
        assert!(matches!(
            c.lookup_one(&q, "alice", "Name"),
            Err(BackendError::IdentityMismatch { .. })
        ));
        assert!(matches!(
            c.lookup_one(&q, "alice", "Name"),
            Err(BackendError::MissingField { .. })
        ));
    }

    #[test]
    fn query_keyed_rejects_duplicates() {
        let runner = Arc::new(ScriptedRunner::with_outputs(&["Name\nbob\nBOB\n"]));
        let err = client(runner)
            .query_keyed(&args(&["glsuser", "--raw"]), HeaderPolicy::AbsentIsEmpty)
            .unwrap_err();
        assert!(matches!(err, BackendError::DuplicateRecord { .. }));
    }
}
