//! Error types for environment setup and live operations.
//!
//! Every error is fatal to a run. A prediction that disagrees with the live
//! client is not an error; it is reported through
//! [`VerificationReport`](crate::runner::VerificationReport).

use std::{io, process::ExitStatus};

use thiserror::Error;

/// Failure of a single external command or file operation.
#[derive(Debug, Error)]
pub enum CommandFailure {
    /// The program could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The program ran but reported failure.
    #[error("`{command}` exited with {status}")]
    Status {
        /// Rendered command line.
        command: String,
        /// Exit status reported by the process.
        status: ExitStatus,
    },
    /// The program succeeded but its output could not be interpreted.
    #[error("unexpected output from `{command}`: {output:?}")]
    Output {
        /// Rendered command line.
        command: String,
        /// Captured standard output.
        output: String,
    },
    /// A local file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fatal errors that abort a tester run.
#[derive(Debug, Error)]
pub enum TesterError {
    /// Provisioning, server-list installation, restart, or login failed.
    #[error("setup failed while {action}: {source}")]
    Setup {
        /// What the driver was doing.
        action: &'static str,
        /// The failing command.
        #[source]
        source: CommandFailure,
    },
    /// An administrative command or live read failed during the test loop.
    #[error("operation failed while {action}: {source}")]
    Operation {
        /// What the gateway was doing.
        action: String,
        /// The failing command.
        #[source]
        source: CommandFailure,
    },
}

impl TesterError {
    /// Wrap `source` as a setup failure.
    #[must_use]
    pub const fn setup(action: &'static str, source: CommandFailure) -> Self {
        Self::Setup { action, source }
    }

    /// Wrap `source` as an operation failure.
    #[must_use]
    pub fn operation(action: impl Into<String>, source: CommandFailure) -> Self {
        Self::Operation {
            action: action.into(),
            source,
        }
    }
}
