//! Randomized differential tester for per-cell hardmount configuration.
//!
//! The tester drives a live file-system client through two configuration
//! mechanisms, a per-cell `setcell` write and a global retry toggle written
//! through `sysctl`, while tracking in memory what every cell's hardmount
//! flags should be. After a random sequence of operations it reads each
//! cell's state back and reports any cell whose live flags differ from the
//! prediction.
//!
//! The pieces compose bottom-up:
//!
//! - [`cell`] and [`interval`] hold the value types.
//! - [`engine`] is the pure prediction model.
//! - [`plan`] draws random operations from a seed.
//! - [`gateway`] and [`environment`] talk to the client through a [`shell`].
//! - [`runner`] runs the differential loop and builds the report.
//! - [`app`] wires everything together for the binary.

pub mod app;
pub mod cell;
pub mod cli;
pub mod engine;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod interval;
pub mod logging;
pub mod operation;
pub mod plan;
pub mod runner;
pub mod shell;
