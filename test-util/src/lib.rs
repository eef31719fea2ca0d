//! Utilities for integration tests.
//!
//! The `test-util` crate provides an in-memory stand-in for the file-system
//! client so the differential loop can be exercised end to end without a
//! provisioned machine. It is used by integration tests in the main crate.

pub mod fixtures;

use std::collections::{HashMap, HashSet};

pub use fixtures::{noop_environment, simulated_client};
use hmtester::{
    cell::HardMount,
    environment::Environment,
    error::{CommandFailure, TesterError},
    gateway::CommandGateway,
    interval::RetryInterval,
};
use tracing::trace;

/// Name of the primary cell used by the fixtures.
pub const PRIMARY_CELL: &str = "robotest";

/// In-memory model of the client's hardmount handling.
///
/// The model keeps the shared retry knobs, the retry interval, the
/// `remote_all` gate, and the effective flags of every cell, and reacts to
/// gateway calls the way the real client does:
///
/// - `setcell` on the primary writes the knobs and the primary's flags. On a
///   remote cell it writes that cell; while the interval is
///   [`RetryInterval::FORCE_IMMEDIATE`] it also resets the knobs and the
///   primary.
/// - `setcell` with any flag enabled while the interval is deferred bumps the
///   interval to [`RetryInterval::FORCE_IMMEDIATE`].
/// - `sysctl` writes the knobs. While the interval is deferred it also
///   reaches the primary, unless the knobs were last written at another
///   interval and no `getcell` has since pulled them into the primary.
/// - `getcell` applies the knobs to a cell only while the interval is
///   deferred, and to a remote cell only while the gate is open.
#[derive(Debug)]
pub struct SimulatedClient {
    primary: String,
    interval: RetryInterval,
    knobs: HardMount,
    remote_all: bool,
    primary_tracks_knobs: bool,
    effective: HashMap<String, HardMount>,
    discrepancies: HashMap<String, HardMount>,
    failing_reads: HashSet<String>,
    calls: Vec<String>,
}

impl SimulatedClient {
    /// A client with every cell soft-mounted and the interval deferred.
    #[must_use]
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_owned(),
            interval: RetryInterval::DEFERRED,
            knobs: HardMount::empty(),
            remote_all: false,
            primary_tracks_knobs: true,
            effective: HashMap::new(),
            discrepancies: HashMap::new(),
            failing_reads: HashSet::new(),
            calls: Vec::new(),
        }
    }

    /// Report `flags` for `cell` regardless of its real state.
    #[must_use]
    pub fn with_discrepancy(mut self, cell: &str, flags: HardMount) -> Self {
        self.discrepancies.insert(cell.to_owned(), flags);
        self
    }

    /// Fail every state read of `cell`.
    #[must_use]
    pub fn with_failing_read(mut self, cell: &str) -> Self {
        self.failing_reads.insert(cell.to_owned());
        self
    }

    /// Effective flags of `cell`, ignoring injected discrepancies.
    #[must_use]
    pub fn effective(&self, cell: &str) -> HardMount {
        self.effective.get(cell).copied().unwrap_or_default()
    }

    /// Current retry interval.
    #[must_use]
    pub const fn interval(&self) -> RetryInterval { self.interval }

    /// Current shared retry knobs.
    #[must_use]
    pub const fn knobs(&self) -> HardMount { self.knobs }

    /// Whether the `remote_all` gate is open.
    #[must_use]
    pub const fn remote_all(&self) -> bool { self.remote_all }

    /// Every gateway call received, in order.
    #[must_use]
    pub fn calls(&self) -> &[String] { &self.calls }

    fn is_primary(&self, cell: &str) -> bool { cell == self.primary }

    fn record(&mut self, call: String) {
        trace!(%call, "simulated client call");
        self.calls.push(call);
    }

    fn set_effective(&mut self, cell: &str, flags: HardMount) {
        self.effective.insert(cell.to_owned(), flags);
    }
}

impl Default for SimulatedClient {
    fn default() -> Self { Self::new(PRIMARY_CELL) }
}

impl CommandGateway for SimulatedClient {
    fn apply_per_cell_mount(&mut self, cell: &str, flags: HardMount) -> Result<(), TesterError> {
        self.record(format!("setcell {cell} {flags}"));
        if self.interval.is_deferred() && !flags.is_empty() {
            self.interval = RetryInterval::FORCE_IMMEDIATE;
        }
        self.set_effective(cell, flags);
        if self.is_primary(cell) {
            self.knobs = flags;
            self.primary_tracks_knobs = true;
        } else if self.interval.is_force_immediate() {
            self.knobs = HardMount::empty();
            self.primary_tracks_knobs = true;
            let primary = self.primary.clone();
            self.set_effective(&primary, HardMount::empty());
        }
        Ok(())
    }

    fn apply_global_retry(&mut self, flags: HardMount) -> Result<(), TesterError> {
        self.record(format!("sysctl retry {flags}"));
        self.knobs = flags;
        if !self.interval.is_deferred() {
            self.primary_tracks_knobs = false;
        } else if self.primary_tracks_knobs {
            let primary = self.primary.clone();
            self.set_effective(&primary, flags);
        }
        Ok(())
    }

    fn apply_global_retry_all(&mut self, enabled: bool) -> Result<(), TesterError> {
        self.record(format!("sysctl remote_all {}", u8::from(enabled)));
        self.remote_all = enabled;
        Ok(())
    }

    fn set_retry_interval(&mut self, interval: RetryInterval) -> Result<(), TesterError> {
        self.record(format!("sysctl int {interval}"));
        self.interval = interval;
        Ok(())
    }

    fn read_live_retry_flags(&mut self) -> Result<HardMount, TesterError> {
        self.record("sysctl read retry".to_owned());
        Ok(self.knobs)
    }

    fn read_live_cell_state(&mut self, cell: &str) -> Result<HardMount, TesterError> {
        self.record(format!("getcell {cell}"));
        if self.failing_reads.contains(cell) {
            return Err(TesterError::operation(
                format!("reading state of {cell}"),
                CommandFailure::Output {
                    command: format!("fs getcell {cell}"),
                    output: String::new(),
                },
            ));
        }
        Ok(self
            .discrepancies
            .get(cell)
            .copied()
            .unwrap_or_else(|| self.effective(cell)))
    }

    fn force_apply(&mut self, cell: &str) -> Result<(), TesterError> {
        self.record(format!("getcell {cell} (apply)"));
        if !self.interval.is_deferred() {
            return Ok(());
        }
        if self.is_primary(cell) {
            self.primary_tracks_knobs = true;
        }
        if self.is_primary(cell) || self.remote_all {
            let knobs = self.knobs;
            self.set_effective(cell, knobs);
        }
        Ok(())
    }
}

/// [`Environment`] that only counts setup and teardown calls.
#[derive(Debug, Default)]
pub struct NoopEnvironment {
    /// Number of completed setups.
    pub setups: usize,
    /// Number of completed teardowns.
    pub teardowns: usize,
    /// Fail setup with this action, if set.
    pub fail_setup: Option<&'static str>,
}

impl Environment for NoopEnvironment {
    fn setup(&mut self) -> Result<(), TesterError> {
        if let Some(action) = self.fail_setup {
            return Err(TesterError::setup(
                action,
                CommandFailure::Output {
                    command: "afsrobot setup".to_owned(),
                    output: String::new(),
                },
            ));
        }
        self.setups += 1;
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), TesterError> {
        self.teardowns += 1;
        Ok(())
    }
}
