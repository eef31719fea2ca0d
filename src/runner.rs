//! Differential test loop.
//!
//! Each planned [`Operation`] is applied to the live client through a
//! [`CommandGateway`] and, independently, to the predicted
//! [`CellRegistry`]. After the last operation every cell's live flags are
//! read back and compared with the prediction.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    cell::{CellRegistry, HardMount},
    engine::{Prediction, SharedRetryState, predict},
    error::TesterError,
    gateway::CommandGateway,
    interval::RetryInterval,
    operation::{CommandLog, CommandLogEntry, Mechanism, Operation},
};

/// A cell whose live flags disagree with the prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellMismatch {
    /// Cell name.
    pub name: String,
    /// Predicted flags.
    pub expected: HardMount,
    /// Flags read from the live client.
    pub actual: HardMount,
}

impl fmt::Display for CellMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cell name: {}", self.name)?;
        writeln!(
            f,
            "Expected RW state: {}, Current RW state: {}",
            self.expected.rw(),
            self.actual.rw()
        )?;
        writeln!(
            f,
            "Expected RO state: {}, Current RO state: {}",
            self.expected.ro(),
            self.actual.ro()
        )?;
        writeln!(f, "--------------------------------------------")
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Cells whose live state did not match, in registry order.
    pub mismatches: Vec<CellMismatch>,
    /// Every operation issued, for manual replay.
    pub commands: CommandLog,
}

impl VerificationReport {
    /// Returns `true` if every cell matched its prediction.
    #[must_use]
    pub fn is_success(&self) -> bool { self.mismatches.is_empty() }

    /// Machine-readable form of the report.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct JsonMismatch<'a> {
            cell: &'a str,
            expected_rw: bool,
            expected_ro: bool,
            actual_rw: bool,
            actual_ro: bool,
        }

        let mismatches: Vec<_> = self
            .mismatches
            .iter()
            .map(|m| JsonMismatch {
                cell: &m.name,
                expected_rw: m.expected.rw(),
                expected_ro: m.expected.ro(),
                actual_rw: m.actual.rw(),
                actual_ro: m.actual.ro(),
            })
            .collect();
        serde_json::json!({
            "success": self.is_success(),
            "mismatches": mismatches,
            "commands": self.commands,
        })
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return writeln!(f, "[SUCCESS]");
        }
        for mismatch in &self.mismatches {
            writeln!(f, "{mismatch}")?;
        }
        writeln!(f, "Commands:\n")?;
        write!(f, "{}", self.commands)?;
        writeln!(f, "\n[FAILED]")
    }
}

/// Drives planned operations against a live client and its prediction.
#[derive(Debug)]
pub struct DifferentialTest<G> {
    gateway: G,
    registry: CellRegistry,
    shared: SharedRetryState,
    log: CommandLog,
}

impl<G: CommandGateway> DifferentialTest<G> {
    /// Start a run over `registry` with every cell predicted soft-mounted.
    #[must_use]
    pub fn new(gateway: G, registry: CellRegistry) -> Self {
        Self {
            gateway,
            registry,
            shared: SharedRetryState::default(),
            log: CommandLog::default(),
        }
    }

    /// Current predicted state.
    #[must_use]
    pub const fn registry(&self) -> &CellRegistry { &self.registry }

    /// Current predicted shared retry state.
    #[must_use]
    pub const fn shared(&self) -> &SharedRetryState { &self.shared }

    /// Operations issued so far.
    #[must_use]
    pub const fn log(&self) -> &CommandLog { &self.log }

    /// Give the gateway back, for inspection after a run.
    #[must_use]
    pub fn into_gateway(self) -> G { self.gateway }

    /// Apply every operation, then verify.
    ///
    /// # Errors
    ///
    /// Returns the first gateway failure; the run is abandoned without a
    /// report.
    pub fn run(&mut self, operations: &[Operation]) -> Result<VerificationReport, TesterError> {
        for op in operations {
            self.step(op)?;
        }
        self.verify()
    }

    /// Apply a single operation live and to the prediction, logging it.
    ///
    /// # Errors
    ///
    /// Returns the first gateway failure.
    pub fn step(&mut self, op: &Operation) -> Result<Prediction, TesterError> {
        let prediction = self.issue(op)?;
        let entry = self.log_entry(op, prediction.resolved_interval);
        debug!(command = %entry, clobbered_primary = prediction.clobbered_primary, "issued");
        self.log.push(entry);

        if let Some(follow_up) = prediction.follow_up {
            debug!(cell = follow_up.cell, "settling primary retry toggle");
            self.settle(&follow_up)?;
        }
        Ok(prediction)
    }

    /// Re-issue the primary toggle at `0/0`. The interval is already
    /// deferred and the primary is not forced, so the toggle lands lazily.
    fn settle(&mut self, op: &Operation) -> Result<(), TesterError> {
        let name = self.cell_name(op.cell);
        apply_global_toggle(&mut self.gateway, &name, true, op.flags)?;
        predict(&mut self.registry, &mut self.shared, op);
        Ok(())
    }

    fn issue(&mut self, op: &Operation) -> Result<Prediction, TesterError> {
        let name = self.cell_name(op.cell);
        self.gateway.set_retry_interval(op.interval)?;
        match op.mechanism {
            Mechanism::PerCellDirect => self.gateway.apply_per_cell_mount(&name, op.flags)?,
            Mechanism::GlobalRetryToggle => {
                let is_primary = self.registry.is_primary(op.cell);
                apply_global_toggle(&mut self.gateway, &name, is_primary, op.flags)?;
            }
        }
        let prediction = predict(&mut self.registry, &mut self.shared, op);
        self.gateway.force_apply(&name)?;
        Ok(prediction)
    }

    /// Read every cell back and compare with the prediction.
    ///
    /// The retry interval is first set to [`RetryInterval::VERIFICATION`] so
    /// the reads do not themselves apply pending state.
    ///
    /// # Errors
    ///
    /// Returns the first gateway failure.
    pub fn verify(&mut self) -> Result<VerificationReport, TesterError> {
        self.gateway.set_retry_interval(RetryInterval::VERIFICATION)?;
        self.shared.interval = RetryInterval::VERIFICATION;

        let mut mismatches = Vec::new();
        for cell in self.registry.iter() {
            let actual = self.gateway.read_live_cell_state(&cell.name)?;
            if actual != cell.predicted {
                warn!(
                    cell = %cell.name,
                    expected = %cell.predicted,
                    actual = %actual,
                    "live state differs from prediction"
                );
                mismatches.push(CellMismatch {
                    name: cell.name.clone(),
                    expected: cell.predicted,
                    actual,
                });
            }
        }
        let report = VerificationReport {
            mismatches,
            commands: self.log.clone(),
        };
        info!(
            success = report.is_success(),
            operations = report.commands.len(),
            "verification finished"
        );
        Ok(report)
    }

    fn cell_name(&self, index: usize) -> String {
        self.registry
            .get(index)
            .map(|cell| cell.name.clone())
            .unwrap_or_default()
    }

    fn log_entry(&self, op: &Operation, interval: RetryInterval) -> CommandLogEntry {
        CommandLogEntry {
            mechanism: op.mechanism,
            cell_name: self.cell_name(op.cell),
            rw: op.flags.rw(),
            ro: op.flags.ro(),
            interval,
        }
    }
}

/// Apply a global retry toggle live.
///
/// A remote target only sees the toggle through the `remote_all` gate, so the
/// previous toggle is saved, the gate is opened around a forced apply of the
/// target, and the toggle is then restored for the primary cell.
///
/// # Errors
///
/// Returns the first gateway failure.
pub fn apply_global_toggle<G: CommandGateway + ?Sized>(
    gateway: &mut G,
    cell: &str,
    is_primary: bool,
    flags: HardMount,
) -> Result<(), TesterError> {
    let previous = if is_primary {
        None
    } else {
        Some(gateway.read_live_retry_flags()?)
    };
    gateway.apply_global_retry(flags)?;
    let Some(previous) = previous else {
        return Ok(());
    };
    gateway.apply_global_retry_all(true)?;
    gateway.force_apply(cell)?;
    gateway.apply_global_retry_all(false)?;
    gateway.apply_global_retry(previous)
}
