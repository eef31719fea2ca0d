//! Run orchestration.
//!
//! Binaries stay thin wrappers around [`run`]; [`execute`] is generic over the
//! environment and gateway so integration tests can drive a full run against
//! an in-memory client.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::info;

use crate::{
    cell::CellRegistry,
    cli::{TesterConfig, admin_tools, environment_paths},
    environment::{AfsEnvironment, Environment, ServerList, write_file},
    error::TesterError,
    gateway::{AfsGateway, CommandGateway},
    operation::Operation,
    plan::{plan_from_seed, seed_from_clock},
    runner::{DifferentialTest, VerificationReport},
    shell::SystemShell,
};

/// Provision the environment, run `operations`, verify, and tear down.
///
/// # Errors
///
/// Returns the first setup or operation failure. Teardown is skipped when the
/// run aborts.
pub fn execute<E, G>(
    environment: &mut E,
    gateway: G,
    registry: CellRegistry,
    operations: &[Operation],
) -> Result<VerificationReport, TesterError>
where
    E: Environment + ?Sized,
    G: CommandGateway,
{
    environment.setup()?;
    let mut test = DifferentialTest::new(gateway, registry);
    let report = test.run(operations)?;
    environment.teardown()?;
    Ok(report)
}

/// Run the tester against the live client described by `config`.
///
/// # Errors
///
/// Returns any [`TesterError`] raised by the run, or a failure to write the
/// JSON report.
pub fn run(config: &TesterConfig) -> Result<VerificationReport> {
    let registry = CellRegistry::new(&config.primary_cell, config.ncells);
    let seed = config.seed.unwrap_or_else(seed_from_clock);
    info!(
        seed,
        ncells = registry.len(),
        nruns = config.nruns,
        "starting hardmount test run"
    );
    let operations = plan_from_seed(seed, registry.len(), config.nruns);

    let server_list =
        ServerList::for_registry(&registry, &config.primary_address, &config.remote_address);
    let mut environment = AfsEnvironment::new(SystemShell, environment_paths(config), server_list);
    let gateway = AfsGateway::new(SystemShell, admin_tools(config));
    let report = execute(&mut environment, gateway, registry, &operations)?;

    if let Some(path) = config.report_json.as_deref() {
        let body = serde_json::to_string_pretty(&report.to_json())?;
        write_file(Utf8Path::new(path), &body)
            .with_context(|| format!("failed to write report to {path}"))?;
    }
    Ok(report)
}
