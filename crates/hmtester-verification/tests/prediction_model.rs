#![expect(clippy::expect_used, reason = "test assertions")]

//! Bounded model checking of the prediction engine.


use std::collections::BTreeSet;

use bounded_check::{MAX_OPERATIONS, MIN_STATE_COUNT, check_prediction_model};
use hmtester::operation::Mechanism;
use hmtester_verification::prediction_model::{
    PredictionModel,
    properties::{CAN_CLOBBER_PRIMARY_NAME, CAN_TOGGLE_REMOTE_NAME},
};
use rstest::rstest;

const PRIMARY: usize = 0;

#[rstest]
#[case(PredictionModel::minimal())]
#[case(PredictionModel::default())]
fn model_verifies_within_bounds(#[case] model: PredictionModel) {
    let check = check_prediction_model(&model);
    assert!(
        check.is_verified(),
        "violated: {:?}, unreached: {:?}",
        check.violations,
        check.unreached
    );
    assert!(check.unique_state_count >= MIN_STATE_COUNT);
}

#[rstest]
fn clobber_needs_a_hard_mounted_primary_then_a_deferred_remote_write() {
    let check = check_prediction_model(&PredictionModel::minimal());
    let ops = check
        .witness(CAN_CLOBBER_PRIMARY_NAME)
        .expect("clobber witnessed");
    assert!(ops.len() >= 2 && ops.len() <= MAX_OPERATIONS, "{ops:?}");

    let (last, earlier) = ops.split_last().expect("non-empty witness");
    assert_eq!(last.mechanism, Mechanism::PerCellDirect);
    assert_ne!(last.cell, PRIMARY);
    assert!(last.interval.is_deferred() && !last.flags.is_empty(), "{last:?}");
    assert!(
        earlier.iter().any(|op| op.mechanism == Mechanism::PerCellDirect
            && op.cell == PRIMARY
            && !op.flags.is_empty()),
        "no primary write before the clobber: {ops:?}"
    );
}

#[rstest]
#[case(PredictionModel::minimal())]
#[case(PredictionModel::default())]
fn remote_toggle_witness_ends_on_a_deferred_remote_toggle(#[case] model: PredictionModel) {
    let check = check_prediction_model(&model);
    let last = check
        .witness(CAN_TOGGLE_REMOTE_NAME)
        .and_then(<[_]>::last)
        .expect("remote toggle witnessed");
    assert_eq!(last.mechanism, Mechanism::GlobalRetryToggle);
    assert_ne!(last.cell, PRIMARY);
    assert!(last.interval.is_deferred());
    assert!(!last.flags.is_empty());
}

#[rstest]
fn single_cell_model_reaches_no_remote_behaviour() {
    let check = check_prediction_model(&PredictionModel::with_cells(1));
    assert!(check.violations.is_empty(), "{:?}", check.violations);
    assert!(check.witnesses.is_empty());
    assert_eq!(
        check.unreached,
        BTreeSet::from([CAN_CLOBBER_PRIMARY_NAME, CAN_TOGGLE_REMOTE_NAME])
    );
}
