//! Random operation planning.
//!
//! Planning is a pure function of the random source so a sequence can be
//! reproduced from its seed and predicted without touching a live client.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    interval::RetryInterval,
    operation::{Mechanism, Operation},
};

/// Draw one operation against a registry of `ncells` cells.
///
/// Mechanism, interval (`0..=3`), target cell, RW and RO are each drawn
/// uniformly.
pub fn draw_operation<R: Rng + ?Sized>(rng: &mut R, ncells: usize) -> Operation {
    let mechanism = if rng.gen_bool(0.5) {
        Mechanism::PerCellDirect
    } else {
        Mechanism::GlobalRetryToggle
    };
    let interval = rng.gen_range(0..=RetryInterval::PLANNED_MAX.secs());
    let cell = rng.gen_range(0..ncells.max(1));
    let rw = rng.gen_bool(0.5);
    let ro = rng.gen_bool(0.5);
    match mechanism {
        Mechanism::PerCellDirect => Operation::per_cell(cell, rw, ro, interval),
        Mechanism::GlobalRetryToggle => Operation::global_toggle(cell, rw, ro, interval),
    }
}

/// Plan `nruns` operations against a registry of `ncells` cells.
pub fn plan_operations<R: Rng + ?Sized>(rng: &mut R, ncells: usize, nruns: usize) -> Vec<Operation> {
    (0..nruns).map(|_| draw_operation(rng, ncells)).collect()
}

/// Plan `nruns` operations from a fixed seed.
#[must_use]
pub fn plan_from_seed(seed: u64, ncells: usize, nruns: usize) -> Vec<Operation> {
    let mut rng = StdRng::seed_from_u64(seed);
    plan_operations(&mut rng, ncells, nruns)
}

/// Derive a planner seed from the wall clock.
#[must_use]
pub fn seed_from_clock() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, i64::unsigned_abs)
}
