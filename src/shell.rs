//! Synchronous execution of external administrative commands.
//!
//! Commands are described as data ([`CommandSpec`]) so the gateway and
//! environment driver can be tested against a scripted [`Shell`] without
//! spawning processes.

use std::{fmt, process::Command};

use tracing::debug;

use crate::error::CommandFailure;

/// A program and its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Start a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Prefix this command with a privilege wrapper such as `sudo`.
    #[must_use]
    pub fn escalated(self, wrapper: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: wrapper.to_owned(),
            args,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs commands to completion.
///
/// Calls block until the command exits; there is no timeout.
pub trait Shell {
    /// Run `spec` and return its standard output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandFailure`] if the command cannot be started or exits
    /// unsuccessfully.
    fn run(&mut self, spec: &CommandSpec) -> Result<String, CommandFailure>;
}

impl<S: Shell + ?Sized> Shell for &mut S {
    fn run(&mut self, spec: &CommandSpec) -> Result<String, CommandFailure> { (**self).run(spec) }
}

/// [`Shell`] backed by real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&mut self, spec: &CommandSpec) -> Result<String, CommandFailure> {
        debug!(command = %spec, "running command");
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .output()
            .map_err(|source| CommandFailure::Spawn {
                command: spec.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(CommandFailure::Status {
                command: spec.to_string(),
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_prefixes_program() {
        let spec = CommandSpec::new("sysctl")
            .args(["-w", "afs.hm_retry_int=3"])
            .escalated("sudo");
        assert_eq!(spec.program, "sudo");
        assert_eq!(spec.to_string(), "sudo sysctl -w afs.hm_retry_int=3");
    }

    #[cfg(unix)]
    #[test]
    fn system_shell_captures_stdout() {
        let out = SystemShell
            .run(&CommandSpec::new("echo").arg("hard-mount"))
            .expect("echo runs");
        assert_eq!(out.trim(), "hard-mount");
    }

    #[cfg(unix)]
    #[test]
    fn system_shell_reports_failure_status() {
        let err = SystemShell
            .run(&CommandSpec::new("false"))
            .expect_err("false fails");
        assert!(matches!(err, CommandFailure::Status { .. }));
    }

    #[test]
    fn system_shell_reports_missing_program() {
        let err = SystemShell
            .run(&CommandSpec::new("hmtester-no-such-program"))
            .expect_err("missing program");
        assert!(matches!(err, CommandFailure::Spawn { .. }));
    }
}
