//! Action enumeration and the pure transition function.
//!
//! An action is a planned [`Operation`]. The model enumerates every
//! operation the planner can draw, so the checker covers exactly the space a
//! live run samples from.

use hmtester::{
    cell::HardMount,
    engine::predict_with_follow_up,
    interval::RetryInterval,
    operation::{Mechanism, Operation},
};

use super::state::{ModelState, StepRecord};

const SWITCHES: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];

/// Every operation the planner can produce for `num_cells` cells.
#[must_use]
pub fn all_operations(num_cells: usize) -> Vec<Operation> {
    let mut ops = Vec::new();
    for &mechanism in Mechanism::all() {
        for cell in 0..num_cells {
            for (rw, ro) in SWITCHES {
                for interval in 0..=RetryInterval::PLANNED_MAX.secs() {
                    ops.push(Operation {
                        mechanism,
                        cell,
                        flags: HardMount::from_switches(rw, ro),
                        interval: RetryInterval::from_secs(interval),
                    });
                }
            }
        }
    }
    ops
}

/// Applies `op` to `state`, returning the resulting state.
///
/// This is a pure function: the input state is not modified. The follow-up
/// settle step, when required, is folded into the same transition because the
/// runner issues it before anything else can happen.
#[must_use]
pub fn apply_operation(state: &ModelState, op: &Operation) -> ModelState {
    let mut next = state.clone();
    let before = state.flags();
    let prediction = predict_with_follow_up(&mut next.registry, &mut next.shared, op);
    let after = next.flags();
    next.last = Some(StepRecord {
        op: *op,
        prediction,
        before,
        after,
    });
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_every_planned_combination() {
        let ops = all_operations(3);
        assert_eq!(ops.len(), 2 * 3 * 4 * 4);
        assert!(ops.iter().all(|op| op.cell < 3));
        assert!(ops.iter().all(|op| op.interval <= RetryInterval::PLANNED_MAX));
    }

    #[test]
    fn transition_records_before_and_after() {
        let state = ModelState::new(2);
        let next = apply_operation(&state, &Operation::per_cell(1, true, false, 2));
        let last = next.last.as_ref().expect("step recorded");
        assert_eq!(last.before(1), HardMount::empty());
        assert_eq!(last.after(1), HardMount::RW);
        assert_eq!(last.changed().collect::<Vec<_>>(), [1]);
        assert!(state.last.is_none(), "input state untouched");
    }
}
