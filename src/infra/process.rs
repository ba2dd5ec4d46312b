//! External process execution
//!
//! [`CommandRunner`] is the single seam through which every external command
//! runs: build steps, git and bookkeeping alike. Commands block until they
//! exit; output is inherited so tool logs stream straight to the terminal.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::platform::PlatformFamily;
use crate::error::ProcessError;

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status of a finished command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code; `None` when the process was killed by a signal
    code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(self) -> bool {
        self.code == Some(0)
    }

    pub fn code(self) -> Option<i32> {
        self.code
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Runs invocations to completion
pub trait CommandRunner {
    /// Run and wait; `Err` only when the program could not be started
    fn run(&self, invocation: &Invocation) -> Result<CommandStatus, ProcessError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<CommandStatus, ProcessError> {
        (**self).run(invocation)
    }
}

/// How a template line becomes an invocation
///
/// Lines are handed to the host shell whole, so globs, `&&` and quoting
/// behave as the template author wrote them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStrategy {
    /// `sh -c <line>`
    Posix,
    /// `cmd /C <line>`
    Cmd,
}

impl ShellStrategy {
    /// Strategy for a host family
    pub fn for_family(family: PlatformFamily) -> Self {
        match family {
            PlatformFamily::Windows => Self::Cmd,
            PlatformFamily::Linux | PlatformFamily::MacOs => Self::Posix,
        }
    }

    /// Wrap a command line for execution in `cwd`
    pub fn invocation(self, line: &str, cwd: &Path) -> Invocation {
        match self {
            Self::Posix => Invocation::new("sh", cwd).arg("-c").arg(line),
            Self::Cmd => Invocation::new("cmd", cwd).arg("/C").arg(line),
        }
    }
}

/// Runs invocations as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandStatus, ProcessError> {
        tracing::info!(
            "Running command: {invocation} on {}",
            invocation.cwd.display()
        );

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| ProcessError::Spawn {
                program: invocation.program.clone(),
                cwd: invocation.cwd.clone(),
                error: e.to_string(),
            })?;

        let status = CommandStatus::from(status);
        tracing::debug!("'{}' finished with {status}", invocation.program);
        Ok(status)
    }
}
