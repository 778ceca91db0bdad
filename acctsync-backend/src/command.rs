//! Backend commands and how they become a process argv.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// One mutating tool invocation: ordered arguments plus the exit codes that
/// mean "already in the desired state".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub args: Vec<String>,
    pub ignorable: BTreeSet<i32>,
}

impl BackendCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ignorable: BTreeSet::new(),
        }
    }

    /// Treat `codes` as success.
    pub fn ignoring(mut self, codes: &[i32]) -> Self {
        self.ignorable.extend(codes.iter().copied());
        self
    }

    pub fn is_ignorable(&self, code: i32) -> bool {
        self.ignorable.contains(&code)
    }
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_args(&self.args))
    }
}

/// Where the tool lives and what precedes the command's own arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLayout {
    /// One executable per command, named by the first argument (Gold).
    BinDir(PathBuf),
    /// A single executable taking fixed leading flags, then the command (Slurm).
    Single { program: PathBuf, leading: Vec<String> },
}

/// Resolves command arguments into the argv actually spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prefix: Vec<String>,
    pub layout: ToolLayout,
}

impl Invocation {
    pub fn new(prefix: Vec<String>, layout: ToolLayout) -> Self {
        Self { prefix, layout }
    }

    /// `prefix… program leading… args…`
    pub fn argv(&self, args: &[String]) -> Vec<String> {
        let mut argv = self.prefix.clone();
        match &self.layout {
            ToolLayout::BinDir(dir) => match args.split_first() {
                Some((tool, rest)) => {
                    argv.push(dir.join(tool).display().to_string());
                    argv.extend(rest.iter().cloned());
                }
                None => argv.push(dir.display().to_string()),
            },
            ToolLayout::Single { program, leading } => {
                argv.push(program.display().to_string());
                argv.extend(leading.iter().cloned());
                argv.extend(args.iter().cloned());
            }
        }
        argv
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = self.prefix.clone();
        match &self.layout {
            ToolLayout::BinDir(dir) => parts.push(format!("{}/<tool>", dir.display())),
            ToolLayout::Single { program, leading } => {
                parts.push(program.display().to_string());
                parts.extend(leading.iter().cloned());
            }
        }
        f.write_str(&display_args(&parts))
    }
}

/// Space-joined argv for logs, quoting arguments that contain whitespace.
pub fn display_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                format!("{arg:?}")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
