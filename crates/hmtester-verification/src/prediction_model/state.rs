//! State types for the prediction model.
//!
//! - [`StepRecord`]: What the most recent operation did to every cell.
//! - [`ModelState`]: Predicted registry and shared retry state.

use hmtester::{
    cell::{CellRegistry, HardMount},
    engine::{Prediction, SharedRetryState},
    operation::Operation,
};

/// Observable outcome of one loop iteration, kept for property checks.
///
/// Only the latest step is retained. Every reachable state is checked, so
/// each transition is inspected exactly when it is the latest.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StepRecord {
    /// Operation that was predicted.
    pub op: Operation,
    /// The engine's verdict for it.
    pub prediction: Prediction,
    /// Predicted flags of every cell before the step.
    pub before: Vec<HardMount>,
    /// Predicted flags of every cell after the step and any follow-up.
    pub after: Vec<HardMount>,
}

impl StepRecord {
    /// Flags of the cell at `index` before the step.
    #[must_use]
    pub fn before(&self, index: usize) -> HardMount { self.before.get(index).copied().unwrap_or_default() }

    /// Flags of the cell at `index` after the step.
    #[must_use]
    pub fn after(&self, index: usize) -> HardMount { self.after.get(index).copied().unwrap_or_default() }

    /// Indices whose flags changed.
    pub fn changed(&self) -> impl Iterator<Item = usize> + '_ {
        self.before
            .iter()
            .zip(&self.after)
            .enumerate()
            .filter(|(_, (b, a))| b != a)
            .map(|(index, _)| index)
    }
}

/// Global state explored by the checker.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ModelState {
    /// Predicted per-cell flags.
    pub registry: CellRegistry,
    /// Predicted shared retry state.
    pub shared: SharedRetryState,
    /// The step that produced this state, if any.
    pub last: Option<StepRecord>,
}

impl ModelState {
    /// All cells soft-mounted, nothing issued yet.
    #[must_use]
    pub fn new(num_cells: usize) -> Self {
        Self {
            registry: CellRegistry::new("robotest", num_cells),
            shared: SharedRetryState::default(),
            last: None,
        }
    }

    /// Snapshot of every cell's predicted flags, in registry order.
    #[must_use]
    pub fn flags(&self) -> Vec<HardMount> { self.registry.iter().map(|cell| cell.predicted).collect() }
}
