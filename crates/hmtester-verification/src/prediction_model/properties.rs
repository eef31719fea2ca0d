//! Safety and reachability properties of the prediction engine.
//!
//! - **Safety** ("always"): Must hold in every reachable state.
//! - **Reachability** ("sometimes"): Must hold on at least one path, so the
//!   interesting branches of the engine are known to be exercised.

use hmtester::{
    cell::HardMount,
    operation::{Mechanism, Operation},
};
use stateright::Property;

use super::{
    PredictionModel,
    state::{ModelState, StepRecord},
};

/// Safety property name: exactly one primary cell.
pub const SINGLE_PRIMARY_NAME: &str = "exactly one primary cell";

/// Safety property name: the primary cell mirrors the shared toggle.
pub const PRIMARY_TRACKS_TOGGLE_NAME: &str = "primary cell tracks the shared toggle";

/// Safety property name: the `remote_all` gate is closed between steps.
pub const GATE_CLOSED_NAME: &str = "remote gate closed between operations";

/// Safety property name: a forced remote write resets the primary.
pub const REMOTE_FORCED_WRITE_CLEARS_PRIMARY_NAME: &str = "remote forced write clears primary";

/// Safety property name: a global toggle off the deferred interval is inert.
pub const OFF_DEFERRED_TOGGLE_IS_NOOP_NAME: &str = "off-deferred global toggle is a no-op";

/// Safety property name: primary per-cell writes never touch remotes.
pub const PRIMARY_WRITE_LEAVES_REMOTES_NAME: &str = "primary writes leave remotes";

/// Safety property name: a remote global toggle only touches its target.
pub const REMOTE_TOGGLE_IS_SCOPED_NAME: &str = "remote global toggle only touches its target";

/// Reachability property name: a remote write clobbers a hard-mounted primary.
pub const CAN_CLOBBER_PRIMARY_NAME: &str = "remote write clobbers hard-mounted primary";

/// Reachability property name: a remote cell is hard-mounted by the toggle.
pub const CAN_TOGGLE_REMOTE_NAME: &str = "remote cell hard-mounted via global toggle";

fn last_step(state: &ModelState, holds: impl FnOnce(&StepRecord, &Operation) -> bool) -> bool {
    state.last.as_ref().is_none_or(|step| holds(step, &step.op))
}

fn is_primary_target(state: &ModelState, op: &Operation) -> bool { state.registry.is_primary(op.cell) }

/// Safety property: the registry always holds exactly one primary cell.
#[must_use]
pub fn single_primary() -> Property<PredictionModel> {
    Property::always(SINGLE_PRIMARY_NAME, |_model, state: &ModelState| {
        state.registry.primary_count() == 1
    })
}

/// Safety property: the primary cell's predicted flags equal the shared
/// toggle after every step.
#[must_use]
pub fn primary_tracks_toggle() -> Property<PredictionModel> {
    Property::always(PRIMARY_TRACKS_TOGGLE_NAME, |_model, state: &ModelState| {
        state.registry.predicted(state.registry.primary_index()) == state.shared.toggle
    })
}

/// Safety property: no step leaves the `remote_all` gate open.
#[must_use]
pub fn gate_closed_between_operations() -> Property<PredictionModel> {
    Property::always(GATE_CLOSED_NAME, |_model, state: &ModelState| !state.shared.remote_all)
}

/// Safety property: a remote per-cell write that ends at the force-immediate
/// interval leaves the primary soft-mounted.
#[must_use]
pub fn remote_forced_write_clears_primary() -> Property<PredictionModel> {
    Property::always(
        REMOTE_FORCED_WRITE_CLEARS_PRIMARY_NAME,
        |_model, state: &ModelState| {
            last_step(state, |step, op| {
                let forced_remote = op.mechanism == Mechanism::PerCellDirect
                    && !is_primary_target(state, op)
                    && step.prediction.resolved_interval.is_force_immediate();
                !forced_remote
                    || (step.after(state.registry.primary_index()).is_empty()
                        && state.shared.toggle.is_empty())
            })
        },
    )
}

/// Safety property: a global toggle at any interval other than deferred
/// changes no predicted flags.
#[must_use]
pub fn off_deferred_toggle_is_noop() -> Property<PredictionModel> {
    Property::always(OFF_DEFERRED_TOGGLE_IS_NOOP_NAME, |_model, state: &ModelState| {
        last_step(state, |step, op| {
            op.mechanism != Mechanism::GlobalRetryToggle
                || op.interval.is_deferred()
                || step.before == step.after
        })
    })
}

/// Safety property: a per-cell write to the primary changes no remote cell.
#[must_use]
pub fn primary_write_leaves_remotes() -> Property<PredictionModel> {
    Property::always(PRIMARY_WRITE_LEAVES_REMOTES_NAME, |_model, state: &ModelState| {
        last_step(state, |step, op| {
            op.mechanism != Mechanism::PerCellDirect
                || !is_primary_target(state, op)
                || step.changed().all(|index| index == op.cell)
        })
    })
}

/// Safety property: a global toggle aimed at a remote cell changes only that
/// cell.
#[must_use]
pub fn remote_toggle_is_scoped() -> Property<PredictionModel> {
    Property::always(REMOTE_TOGGLE_IS_SCOPED_NAME, |_model, state: &ModelState| {
        last_step(state, |step, op| {
            op.mechanism != Mechanism::GlobalRetryToggle
                || is_primary_target(state, op)
                || step.changed().all(|index| index == op.cell)
        })
    })
}

/// Reachability property: a remote write resets a primary that was
/// hard-mounted.
#[must_use]
pub fn can_clobber_primary() -> Property<PredictionModel> {
    Property::sometimes(CAN_CLOBBER_PRIMARY_NAME, |_model, state: &ModelState| {
        state.last.as_ref().is_some_and(|step| {
            let primary = state.registry.primary_index();
            step.prediction.clobbered_primary
                && step.before(primary) != HardMount::empty()
                && step.after(primary).is_empty()
        })
    })
}

/// Reachability property: a remote cell becomes hard-mounted through the
/// global toggle.
#[must_use]
pub fn can_toggle_remote() -> Property<PredictionModel> {
    Property::sometimes(CAN_TOGGLE_REMOTE_NAME, |_model, state: &ModelState| {
        state.last.as_ref().is_some_and(|step| {
            step.op.mechanism == Mechanism::GlobalRetryToggle
                && !state.registry.is_primary(step.op.cell)
                && !step.after(step.op.cell).is_empty()
        })
    })
}
