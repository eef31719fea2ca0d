//! Live administrative commands against the client.
//!
//! [`CommandGateway`] is the seam between the differential test loop and the
//! running client. [`AfsGateway`] drives a real client through `fs` and
//! `sysctl`; tests substitute an in-memory client.

use crate::{
    cell::HardMount,
    error::{CommandFailure, TesterError},
    interval::RetryInterval,
    shell::{CommandSpec, Shell},
};

/// `fs getcell` phrase reported when RW hardmount is enabled.
pub const RW_ENABLED_PHRASE: &str = "hard-mount for read-write volumes enabled";
/// `fs getcell` phrase reported when RO hardmount is enabled.
pub const RO_ENABLED_PHRASE: &str = "hard-mount for read-only volumes enabled";

const SYSCTL_RETRY_RW: &str = "afs.hm_retry_RW";
const SYSCTL_RETRY_RO: &str = "afs.hm_retry_RO";
const SYSCTL_RETRY_REMOTE_ALL: &str = "afs.hm_retry_remote_all";
const SYSCTL_RETRY_INTERVAL: &str = "afs.hm_retry_int";

/// Administrative surface of the live client.
///
/// Each call blocks until the change has been applied; any failure is fatal
/// to the run.
pub trait CommandGateway {
    /// Set `cell`'s RW and RO hardmount flags directly.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn apply_per_cell_mount(&mut self, cell: &str, flags: HardMount) -> Result<(), TesterError>;

    /// Set the shared RW and RO retry toggles.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn apply_global_retry(&mut self, flags: HardMount) -> Result<(), TesterError>;

    /// Open or close the gate that applies the shared toggles to remote
    /// cells.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn apply_global_retry_all(&mut self, enabled: bool) -> Result<(), TesterError>;

    /// Set the process-wide retry interval.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn set_retry_interval(&mut self, interval: RetryInterval) -> Result<(), TesterError>;

    /// Read the shared RW and RO retry toggles.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails or its output
    /// cannot be parsed.
    fn read_live_retry_flags(&mut self) -> Result<HardMount, TesterError>;

    /// Read the hardmount flags the client reports for `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn read_live_cell_state(&mut self, cell: &str) -> Result<HardMount, TesterError>;

    /// Make lazily-set state for `cell` take effect now.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Operation`] if the command fails.
    fn force_apply(&mut self, cell: &str) -> Result<(), TesterError>;
}

impl<G: CommandGateway + ?Sized> CommandGateway for &mut G {
    fn apply_per_cell_mount(&mut self, cell: &str, flags: HardMount) -> Result<(), TesterError> {
        (**self).apply_per_cell_mount(cell, flags)
    }

    fn apply_global_retry(&mut self, flags: HardMount) -> Result<(), TesterError> {
        (**self).apply_global_retry(flags)
    }

    fn apply_global_retry_all(&mut self, enabled: bool) -> Result<(), TesterError> {
        (**self).apply_global_retry_all(enabled)
    }

    fn set_retry_interval(&mut self, interval: RetryInterval) -> Result<(), TesterError> {
        (**self).set_retry_interval(interval)
    }

    fn read_live_retry_flags(&mut self) -> Result<HardMount, TesterError> {
        (**self).read_live_retry_flags()
    }

    fn read_live_cell_state(&mut self, cell: &str) -> Result<HardMount, TesterError> {
        (**self).read_live_cell_state(cell)
    }

    fn force_apply(&mut self, cell: &str) -> Result<(), TesterError> { (**self).force_apply(cell) }
}

/// Paths of the administrative tools the gateway invokes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminTools {
    /// `fs` binary.
    pub fs_bin: String,
    /// `sysctl` binary.
    pub sysctl_bin: String,
    /// Privilege wrapper for commands that need root.
    pub sudo_bin: String,
}

impl Default for AdminTools {
    fn default() -> Self {
        Self {
            fs_bin: cli_defs::DEFAULT_FS_BIN.to_owned(),
            sysctl_bin: "sysctl".to_owned(),
            sudo_bin: "sudo".to_owned(),
        }
    }
}

impl AdminTools {
    fn setcell(&self, cell: &str, flags: HardMount) -> CommandSpec {
        CommandSpec::new(&self.fs_bin)
            .args(["setcell", cell])
            .args(["-hardmount-rw", on_off(flags.rw())])
            .args(["-hardmount-ro", on_off(flags.ro())])
            .escalated(&self.sudo_bin)
    }

    fn getcell(&self, cell: &str) -> CommandSpec {
        CommandSpec::new(&self.fs_bin).args(["getcell", cell])
    }

    fn sysctl_write(&self, key: &str, value: u32) -> CommandSpec {
        CommandSpec::new(&self.sysctl_bin)
            .args(["-w".to_owned(), format!("{key}={value}")])
            .escalated(&self.sudo_bin)
    }

    fn sysctl_read(&self, key: &str) -> CommandSpec {
        CommandSpec::new(&self.sysctl_bin)
            .arg(key)
            .escalated(&self.sudo_bin)
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

/// Parse `sysctl` output of the form `key = value` into a switch.
///
/// # Errors
///
/// Returns [`CommandFailure::Output`] when no integer follows the `=`.
pub fn parse_sysctl_switch(command: &CommandSpec, output: &str) -> Result<bool, CommandFailure> {
    output
        .split_once('=')
        .and_then(|(_, value)| value.trim().parse::<u32>().ok())
        .map(|value| value != 0)
        .ok_or_else(|| CommandFailure::Output {
            command: command.to_string(),
            output: output.to_owned(),
        })
}

/// Interpret `fs getcell` output.
#[must_use]
pub fn parse_cell_state(output: &str) -> HardMount {
    HardMount::from_switches(
        output.contains(RW_ENABLED_PHRASE),
        output.contains(RO_ENABLED_PHRASE),
    )
}

/// [`CommandGateway`] that drives a real client through a [`Shell`].
#[derive(Debug)]
pub struct AfsGateway<S> {
    shell: S,
    tools: AdminTools,
}

impl<S: Shell> AfsGateway<S> {
    /// Create a gateway running `tools` through `shell`.
    #[must_use]
    pub const fn new(shell: S, tools: AdminTools) -> Self { Self { shell, tools } }

    fn exec(&mut self, action: impl FnOnce() -> String, spec: &CommandSpec) -> Result<String, TesterError> {
        self.shell
            .run(spec)
            .map_err(|source| TesterError::operation(action(), source))
    }

    fn read_switch(&mut self, key: &str) -> Result<bool, TesterError> {
        let spec = self.tools.sysctl_read(key);
        let output = self.exec(|| format!("reading {key}"), &spec)?;
        parse_sysctl_switch(&spec, &output).map_err(|source| TesterError::operation(format!("reading {key}"), source))
    }

    fn write_sysctl(&mut self, key: &str, value: u32) -> Result<(), TesterError> {
        let spec = self.tools.sysctl_write(key, value);
        self.exec(|| format!("setting {key}={value}"), &spec)
            .map(drop)
    }
}

impl<S: Shell> CommandGateway for AfsGateway<S> {
    fn apply_per_cell_mount(&mut self, cell: &str, flags: HardMount) -> Result<(), TesterError> {
        let spec = self.tools.setcell(cell, flags);
        self.exec(|| format!("running setcell for {cell}"), &spec)
            .map(drop)
    }

    fn apply_global_retry(&mut self, flags: HardMount) -> Result<(), TesterError> {
        self.write_sysctl(SYSCTL_RETRY_RW, u32::from(flags.rw()))?;
        self.write_sysctl(SYSCTL_RETRY_RO, u32::from(flags.ro()))
    }

    fn apply_global_retry_all(&mut self, enabled: bool) -> Result<(), TesterError> {
        self.write_sysctl(SYSCTL_RETRY_REMOTE_ALL, u32::from(enabled))
    }

    fn set_retry_interval(&mut self, interval: RetryInterval) -> Result<(), TesterError> {
        self.write_sysctl(SYSCTL_RETRY_INTERVAL, interval.secs())
    }

    fn read_live_retry_flags(&mut self) -> Result<HardMount, TesterError> {
        let rw = self.read_switch(SYSCTL_RETRY_RW)?;
        let ro = self.read_switch(SYSCTL_RETRY_RO)?;
        Ok(HardMount::from_switches(rw, ro))
    }

    fn read_live_cell_state(&mut self, cell: &str) -> Result<HardMount, TesterError> {
        let spec = self.tools.getcell(cell);
        let output = self.exec(|| format!("reading state of {cell}"), &spec)?;
        Ok(parse_cell_state(&output))
    }

    fn force_apply(&mut self, cell: &str) -> Result<(), TesterError> {
        let spec = self.tools.getcell(cell);
        self.exec(|| format!("forcing state of {cell}"), &spec)
            .map(drop)
    }
}
