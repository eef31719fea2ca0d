#![expect(clippy::expect_used, reason = "test assertions")]

//! End-to-end runs of the differential loop against the simulated client.

use hmtester::{
    app::execute,
    cell::{CellRegistry, HardMount},
    error::TesterError,
    interval::RetryInterval,
    operation::{Mechanism, Operation},
    plan::plan_from_seed,
    runner::DifferentialTest,
};
use rstest::rstest;
use test_util::{
    NoopEnvironment,
    PRIMARY_CELL,
    SimulatedClient,
    noop_environment,
    simulated_client,
};

fn registry(ncells: usize) -> CellRegistry { CellRegistry::new(PRIMARY_CELL, ncells) }

#[rstest]
fn empty_single_cell_run_succeeds(
    mut noop_environment: NoopEnvironment,
    simulated_client: SimulatedClient,
) {
    let report =
        execute(&mut noop_environment, simulated_client, registry(1), &[]).expect("run");
    assert!(report.is_success());
    assert_eq!(report.to_string(), "[SUCCESS]\n");
    assert_eq!(noop_environment.setups, 1);
    assert_eq!(noop_environment.teardowns, 1);
}

#[rstest]
#[case(1, 11)]
#[case(2, 7)]
#[case(3, 42)]
#[case(5, 1_700_000_000)]
#[case(8, 0)]
fn random_runs_always_agree_with_the_client(#[case] ncells: usize, #[case] seed: u64) {
    let mut env = NoopEnvironment::default();
    let ops = plan_from_seed(seed, ncells, 100);
    let report = execute(&mut env, SimulatedClient::default(), registry(ncells), &ops)
        .expect("run");
    assert!(report.is_success(), "seed {seed} failed:\n{report}");
    assert_eq!(report.commands.len(), 100);
}

#[rstest]
fn injected_discrepancy_flags_exactly_that_cell() {
    let client = SimulatedClient::default().with_discrepancy("cellname_2", HardMount::RO);
    let mut env = NoopEnvironment::default();
    let ops = [Operation::per_cell(1, true, false, 3)];
    let report = execute(&mut env, client, registry(4), &ops).expect("run");

    assert!(!report.is_success());
    let flagged: Vec<_> = report.mismatches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(flagged, ["cellname_2"]);
    let mismatch = report.mismatches.first().expect("one mismatch");
    assert_eq!(mismatch.expected, HardMount::empty());
    assert_eq!(mismatch.actual, HardMount::RO);

    let text = report.to_string();
    assert!(text.contains("Cell name: cellname_2"));
    assert!(text.contains("setcell cellname_1 rw=1 ro=0 int=3"));
    assert!(text.ends_with("[FAILED]\n"));
}

#[rstest]
fn primary_write_leaves_remotes_live_and_predicted(simulated_client: SimulatedClient) {
    let mut test = DifferentialTest::new(simulated_client, registry(3));
    test.step(&Operation::per_cell(0, true, false, 5)).expect("step");

    assert_eq!(test.registry().predicted(0), HardMount::RW);
    assert_eq!(test.registry().predicted(1), HardMount::empty());
    assert_eq!(test.registry().predicted(2), HardMount::empty());
    assert!(test.verify().expect("verify").is_success());
}

#[rstest]
fn deferred_remote_write_clobbers_primary_live(simulated_client: SimulatedClient) {
    let mut test = DifferentialTest::new(simulated_client, registry(2));
    test.step(&Operation::per_cell(0, true, true, 1)).expect("prime");
    let prediction = test
        .step(&Operation::per_cell(1, true, true, 0))
        .expect("step");

    assert!(prediction.clobbered_primary);
    assert_eq!(test.shared().interval, RetryInterval::FORCE_IMMEDIATE);
    assert_eq!(test.registry().predicted(0), HardMount::empty());
    assert_eq!(test.registry().predicted(1), HardMount::all());
    assert_eq!(
        test.log().to_string(),
        "setcell robotest rw=1 ro=1 int=1\nsetcell cellname_1 rw=1 ro=1 int=60\n"
    );

    let report = test.verify().expect("verify");
    assert!(report.is_success(), "{report}");
    let client = test.into_gateway();
    assert_eq!(client.effective(PRIMARY_CELL), HardMount::empty());
    assert_eq!(client.interval(), RetryInterval::VERIFICATION);
}

#[rstest]
fn off_deferred_global_toggle_changes_nothing(simulated_client: SimulatedClient) {
    let mut test = DifferentialTest::new(simulated_client, registry(2));
    let prediction = test
        .step(&Operation::global_toggle(1, true, false, 7))
        .expect("step");

    assert!(!prediction.applied);
    assert!(test.registry().iter().all(|cell| cell.predicted.is_empty()));
    assert!(test.verify().expect("verify").is_success());
    let client = test.into_gateway();
    assert!(!client.remote_all());
    assert_eq!(client.knobs(), HardMount::empty());
}

#[rstest]
fn deferred_primary_toggle_settles_live(simulated_client: SimulatedClient) {
    let mut test = DifferentialTest::new(simulated_client, registry(2));
    test.step(&Operation::global_toggle(0, true, true, 0))
        .expect("step");

    assert_eq!(test.log().len(), 1);
    assert_eq!(test.registry().predicted(0), HardMount::empty());
    assert!(test.verify().expect("verify").is_success());
    let client = test.into_gateway();
    assert_eq!(
        client.calls(),
        [
            "sysctl int 0",
            "sysctl retry RW=true RO=true",
            "getcell robotest (apply)",
            "sysctl retry RW=false RO=false",
            "sysctl int 1",
            "getcell robotest",
            "getcell cellname_1",
        ]
    );
}

#[rstest]
fn stale_toggle_does_not_leak_into_primary(simulated_client: SimulatedClient) {
    let mut test = DifferentialTest::new(simulated_client, registry(3));
    test.step(&Operation::per_cell(0, false, true, 2)).expect("primary");
    test.step(&Operation::global_toggle(0, true, false, 3))
        .expect("inert toggle");
    test.step(&Operation::global_toggle(2, false, true, 0))
        .expect("remote toggle");

    assert_eq!(test.registry().predicted(0), HardMount::RO);
    assert_eq!(test.registry().predicted(2), HardMount::RO);
    let report = test.verify().expect("verify");
    assert!(report.is_success(), "{report}");
}

#[rstest]
fn failed_read_aborts_the_run() {
    let client = SimulatedClient::default().with_failing_read("cellname_1");
    let mut env = NoopEnvironment::default();
    let err = execute(&mut env, client, registry(2), &[]).expect_err("must abort");
    assert!(matches!(err, TesterError::Operation { .. }));
    assert_eq!(env.teardowns, 0, "teardown is skipped on abort");
}

#[rstest]
fn failed_setup_runs_nothing() {
    let mut env = NoopEnvironment {
        fail_setup: Some("starting the client"),
        ..NoopEnvironment::default()
    };
    let client = SimulatedClient::default();
    let err = execute(&mut env, client, registry(2), &[]).expect_err("must abort");
    assert!(matches!(
        err,
        TesterError::Setup {
            action: "starting the client",
            ..
        }
    ));
}

#[rstest]
fn planned_runs_exercise_both_mechanisms() {
    let ops = plan_from_seed(9, 4, 100);
    for mechanism in Mechanism::all() {
        assert!(ops.iter().any(|op| op.mechanism == *mechanism));
    }
}
