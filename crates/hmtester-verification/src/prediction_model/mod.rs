//! Stateright model of the prediction engine.
//!
//! The model starts with every cell soft-mounted and explores every sequence
//! of planned operations up to the checker's bounds, applying each through
//! the same prediction code the runner uses. It verifies that:
//!
//! 1. **Structure**: There is always exactly one primary cell, and the primary's flags mirror the
//!    shared retry toggle.
//! 2. **Per-cell scoping**: Primary writes never touch remote cells, and a remote write at the
//!    force-immediate interval resets the primary.
//! 3. **Toggle scoping**: The global toggle is inert off the deferred interval and, aimed at a
//!    remote cell, touches only that cell.
//!
//! # Example
//!
//! ```
//! use hmtester_verification::prediction_model::PredictionModel;
//! use stateright::{Checker, Model};
//!
//! let checker = PredictionModel::minimal()
//!     .checker()
//!     .target_max_depth(3)
//!     .spawn_bfs()
//!     .join();
//! assert!(checker.unique_state_count() > 1);
//! ```

pub mod actions;
pub mod properties;
pub mod state;

use hmtester::operation::Operation;
use stateright::{Model, Property};

use self::{
    actions::{all_operations, apply_operation},
    properties::{
        can_clobber_primary,
        can_toggle_remote,
        gate_closed_between_operations,
        off_deferred_toggle_is_noop,
        primary_tracks_toggle,
        primary_write_leaves_remotes,
        remote_forced_write_clears_primary,
        remote_toggle_is_scoped,
        single_primary,
    },
    state::ModelState,
};

/// Configuration for the prediction model.
#[derive(Clone, Debug)]
pub struct PredictionModel {
    /// Number of cells, including the primary.
    pub num_cells: usize,
}

impl Default for PredictionModel {
    fn default() -> Self { Self { num_cells: 3 } }
}

impl PredictionModel {
    /// A model with `num_cells` cells. Zero is saturated to one.
    #[must_use]
    pub fn with_cells(num_cells: usize) -> Self {
        Self {
            num_cells: num_cells.max(1),
        }
    }

    /// The smallest model with a remote cell: a primary and one remote.
    #[must_use]
    pub const fn minimal() -> Self { Self { num_cells: 2 } }
}

impl Model for PredictionModel {
    type State = ModelState;
    type Action = Operation;

    fn init_states(&self) -> Vec<Self::State> { vec![ModelState::new(self.num_cells)] }

    fn actions(&self, _state: &Self::State, actions: &mut Vec<Self::Action>) {
        actions.extend(all_operations(self.num_cells));
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        Some(apply_operation(state, &action))
    }

    fn properties(&self) -> Vec<Property<Self>> {
        vec![
            // Safety properties
            single_primary(),
            primary_tracks_toggle(),
            gate_closed_between_operations(),
            remote_forced_write_clears_primary(),
            off_deferred_toggle_is_noop(),
            primary_write_leaves_remotes(),
            remote_toggle_is_scoped(),
            // Reachability properties
            can_clobber_primary(),
            can_toggle_remote(),
        ]
    }
}
