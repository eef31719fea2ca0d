//! State prediction engine.
//!
//! Given an [`Operation`], this module computes what the live client's
//! hardmount flags should become without ever querying it. The rules encode
//! the two mechanisms' divergent scoping:
//!
//! - **`PerCellDirect`**: Sets the target cell's flags. Enabling a flag while the interval is
//!   [`RetryInterval::DEFERRED`] bumps the interval to [`RetryInterval::FORCE_IMMEDIATE`]. A
//!   *remote* write at that interval resets the shared retry toggle and with it the primary cell's
//!   flags. Primary writes never touch remote cells.
//! - **`GlobalRetryToggle`**: Only takes effect while the interval is deferred; any other interval
//!   leaves every predicted flag untouched. A primary target adopts the toggle directly. A remote
//!   target adopts it through the transient `remote_all` gate, after which the toggle is restored
//!   so the primary is unaffected. A deferred primary toggle must be followed by a settling `0/0`
//!   toggle, returned as [`Prediction::follow_up`].

use crate::{
    cell::{CellRegistry, HardMount},
    interval::RetryInterval,
    operation::{Mechanism, Operation},
};

/// Process-wide retry state shared by every cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SharedRetryState {
    /// Retry interval currently in force.
    pub interval: RetryInterval,
    /// Shared RW/RO retry toggle. The primary cell's settings live here.
    pub toggle: HardMount,
    /// Whether lazily-set toggles are being applied to remote cells.
    pub remote_all: bool,
}

/// Result of predicting a single operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Prediction {
    /// Interval after sentinel resolution; this is what the command log
    /// records.
    pub resolved_interval: RetryInterval,
    /// Whether the target cell's predicted flags were written.
    pub applied: bool,
    /// Whether the primary cell was reset as a side effect.
    pub clobbered_primary: bool,
    /// Operation the caller must issue immediately afterwards, live and
    /// predicted.
    pub follow_up: Option<Operation>,
}

impl Prediction {
    const fn skipped(resolved_interval: RetryInterval) -> Self {
        Self {
            resolved_interval,
            applied: false,
            clobbered_primary: false,
            follow_up: None,
        }
    }
}

/// Update `registry` and `shared` for `op`.
///
/// This never fails: the target index comes from the planner and the
/// registry ignores indices it does not hold.
pub fn predict(
    registry: &mut CellRegistry,
    shared: &mut SharedRetryState,
    op: &Operation,
) -> Prediction {
    match op.mechanism {
        Mechanism::PerCellDirect => predict_per_cell(registry, shared, op),
        Mechanism::GlobalRetryToggle => predict_global_toggle(registry, shared, op),
    }
}

/// Interval a per-cell write leaves behind.
#[must_use]
pub const fn resolve_per_cell_interval(requested: RetryInterval, flags: HardMount) -> RetryInterval {
    if requested.is_deferred() && !flags.is_empty() {
        RetryInterval::FORCE_IMMEDIATE
    } else {
        requested
    }
}

fn predict_per_cell(
    registry: &mut CellRegistry,
    shared: &mut SharedRetryState,
    op: &Operation,
) -> Prediction {
    shared.interval = resolve_per_cell_interval(op.interval, op.flags);
    registry.set_predicted(op.cell, op.flags);

    if registry.is_primary(op.cell) {
        shared.toggle = op.flags;
        return Prediction {
            applied: true,
            ..Prediction::skipped(shared.interval)
        };
    }

    let clobbered_primary = shared.interval.is_force_immediate();
    if clobbered_primary {
        shared.toggle = HardMount::empty();
        registry.set_predicted(registry.primary_index(), HardMount::empty());
    }
    Prediction {
        applied: true,
        clobbered_primary,
        ..Prediction::skipped(shared.interval)
    }
}

fn predict_global_toggle(
    registry: &mut CellRegistry,
    shared: &mut SharedRetryState,
    op: &Operation,
) -> Prediction {
    shared.interval = op.interval;
    if !op.interval.is_deferred() {
        return Prediction::skipped(shared.interval);
    }

    if registry.is_primary(op.cell) {
        shared.toggle = op.flags;
        registry.set_predicted(op.cell, op.flags);
        return Prediction {
            applied: true,
            follow_up: Some(settle_operation(op.cell)),
            ..Prediction::skipped(shared.interval)
        };
    }

    let previous = shared.toggle;
    shared.toggle = op.flags;
    shared.remote_all = true;
    registry.set_predicted(op.cell, shared.toggle);
    shared.remote_all = false;
    shared.toggle = previous;
    Prediction {
        applied: true,
        ..Prediction::skipped(shared.interval)
    }
}

/// The `0/0` deferred toggle that settles the primary cell.
#[must_use]
pub const fn settle_operation(primary: usize) -> Operation {
    Operation::global_toggle(primary, false, false, RetryInterval::DEFERRED.secs())
}

/// Predict `op` and any follow-up it requires, in order.
///
/// This is the prediction-only equivalent of one loop iteration and is what
/// the property tests and the model checker drive.
pub fn predict_with_follow_up(
    registry: &mut CellRegistry,
    shared: &mut SharedRetryState,
    op: &Operation,
) -> Prediction {
    let prediction = predict(registry, shared, op);
    if let Some(follow_up) = prediction.follow_up {
        predict(registry, shared, &follow_up);
    }
    prediction
}
