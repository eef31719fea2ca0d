//! `rstest` fixtures for the test doubles.

// The rstest #[fixture] macro generates sibling items that cannot be
// individually annotated, requiring this module-level suppression.
#![expect(
    missing_docs,
    reason = "rstest #[fixture] macro generates undocumented helper items"
)]

use rstest::fixture;

use crate::{NoopEnvironment, SimulatedClient};

/// Fresh simulated client with the default primary cell.
#[fixture]
pub fn simulated_client() -> SimulatedClient { SimulatedClient::default() }

/// Environment double that succeeds.
#[fixture]
pub fn noop_environment() -> NoopEnvironment { NoopEnvironment::default() }
