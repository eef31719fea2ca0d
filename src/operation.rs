//! Operations issued by the tester and the command log that records them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{cell::HardMount, interval::RetryInterval};

/// Administrative mechanism used to change hardmount configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Set one cell's flags explicitly (`fs setcell`).
    PerCellDirect,
    /// Set the process-wide retry flags (`sysctl afs.hm_retry_*`), which are
    /// applied lazily and scoped by primary/remote.
    GlobalRetryToggle,
}

impl Mechanism {
    /// Every mechanism, in planner order.
    #[must_use]
    pub const fn all() -> &'static [Self] { &[Self::PerCellDirect, Self::GlobalRetryToggle] }

    /// Verb used when rendering a command log line.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::PerCellDirect => "setcell",
            Self::GlobalRetryToggle => "sysctl",
        }
    }
}

/// One planned configuration change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    /// Mechanism used to apply the change.
    pub mechanism: Mechanism,
    /// Index of the target cell in the [`CellRegistry`](crate::cell::CellRegistry).
    pub cell: usize,
    /// Requested flags.
    pub flags: HardMount,
    /// Retry interval set before the change is applied.
    pub interval: RetryInterval,
}

impl Operation {
    /// A per-cell direct write.
    #[must_use]
    pub const fn per_cell(cell: usize, rw: bool, ro: bool, interval: u32) -> Self {
        Self {
            mechanism: Mechanism::PerCellDirect,
            cell,
            flags: HardMount::from_switches(rw, ro),
            interval: RetryInterval::from_secs(interval),
        }
    }

    /// A global retry toggle targeting `cell`.
    #[must_use]
    pub const fn global_toggle(cell: usize, rw: bool, ro: bool, interval: u32) -> Self {
        Self {
            mechanism: Mechanism::GlobalRetryToggle,
            cell,
            flags: HardMount::from_switches(rw, ro),
            interval: RetryInterval::from_secs(interval),
        }
    }
}

/// Immutable record of an issued operation, kept for failure diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    /// Mechanism that was used.
    pub mechanism: Mechanism,
    /// Name of the target cell.
    pub cell_name: String,
    /// Requested RW flag.
    pub rw: bool,
    /// Requested RO flag.
    pub ro: bool,
    /// Interval after resolution by the prediction engine.
    pub interval: RetryInterval,
}

impl fmt::Display for CommandLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} rw={} ro={} int={}",
            self.mechanism.verb(),
            self.cell_name,
            u8::from(self.rw),
            u8::from(self.ro),
            self.interval
        )
    }
}

/// Append-only log of issued operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandLog {
    entries: Vec<CommandLogEntry>,
}

impl CommandLog {
    /// Record an entry at the end of the log.
    pub fn push(&mut self, entry: CommandLogEntry) { self.entries.push(entry); }

    /// Entries in issuance order.
    #[must_use]
    pub fn entries(&self) -> &[CommandLogEntry] { &self.entries }

    /// Number of recorded entries.
    #[must_use]
    pub const fn len(&self) -> usize { self.entries.len() }

    /// Returns `true` when nothing has been issued.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl fmt::Display for CommandLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
