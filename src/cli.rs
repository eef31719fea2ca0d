//! Command-line handling for the `hmtester` binary.
//!
//! The definitions live in the `cli-defs` crate so `build.rs` can render the
//! man page; this module adds argument normalization and layered loading.

use std::ffi::OsString;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
pub use cli_defs::{Cli, TesterConfig};
use ortho_config::OrthoConfig;

use crate::{environment::EnvironmentPaths, gateway::AdminTools};

/// Single-dash flag spellings accepted for compatibility, with their
/// canonical forms.
const LEGACY_FLAGS: &[(&str, &str)] = &[("-ncells", "--ncells"), ("-nruns", "--nruns")];

/// Rewrite `-ncells` and `-nruns` to their double-dash forms.
///
/// Every other argument is passed through untouched.
#[must_use]
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| arg == *legacy)
                .map_or(arg, |(_, canonical)| OsString::from(*canonical))
        })
        .collect()
}

/// Load the layered configuration from normalized arguments.
///
/// # Errors
///
/// Returns an error when the arguments, environment, or configuration file
/// cannot be merged into a [`TesterConfig`].
pub fn load_config(args: &[OsString]) -> Result<TesterConfig> {
    TesterConfig::load_from_iter(args.iter().cloned())
        .context("failed to load configuration")
}

/// Tool paths for the [`AfsGateway`](crate::gateway::AfsGateway).
#[must_use]
pub fn admin_tools(config: &TesterConfig) -> AdminTools {
    AdminTools {
        fs_bin: config.fs_bin.clone(),
        sysctl_bin: config.sysctl_bin.clone(),
        sudo_bin: config.sudo_bin.clone(),
    }
}

/// Commands and paths for the
/// [`AfsEnvironment`](crate::environment::AfsEnvironment).
#[must_use]
pub fn environment_paths(config: &TesterConfig) -> EnvironmentPaths {
    EnvironmentPaths {
        robot_bin: config.robot_bin.clone(),
        sudo_bin: config.sudo_bin.clone(),
        client_init_script: config.client_init_script.clone(),
        server_list_tmp: Utf8PathBuf::from(&config.server_list_tmp),
        server_list_dest: Utf8PathBuf::from(&config.server_list_dest),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&["hmtester", "-ncells", "3", "-nruns", "10"], &["hmtester", "--ncells", "3", "--nruns", "10"])]
    #[case(&["hmtester", "--ncells", "3", "--nruns", "10"], &["hmtester", "--ncells", "3", "--nruns", "10"])]
    #[case(&["hmtester", "-nruns", "-ncells"], &["hmtester", "--nruns", "--ncells"])]
    fn legacy_flags_are_rewritten(#[case] input: &[&str], #[case] expected: &[&str]) {
        let normalized = normalize_args(input.iter().copied());
        let expected: Vec<OsString> = expected.iter().map(OsString::from).collect();
        assert_eq!(normalized, expected);
    }

    #[rstest]
    #[case(&["hmtester", "-ncells", "x", "-nruns", "1"])]
    #[case(&["hmtester", "-ncells", "2", "-nruns"])]
    #[case(&["hmtester", "-nruns", "2"])]
    fn malformed_invocations_are_rejected(#[case] input: &[&str]) {
        let args = normalize_args(input.iter().copied());
        assert!(Cli::try_parse_from(&args).is_err());
    }

    #[rstest]
    fn legacy_invocation_loads_config() {
        Jail::expect_with(|_j| {
            let args = normalize_args(["hmtester", "-ncells", "4", "-nruns", "100"]);
            let config = load_config(&args).expect("load");
            assert_eq!(config.ncells, 4);
            assert_eq!(config.nruns, 100);

            let tools = admin_tools(&config);
            assert_eq!(tools, AdminTools::default());
            let paths = environment_paths(&config);
            assert_eq!(paths.server_list_tmp, "/tmp/CellServDB");
            assert_eq!(paths.server_list_dest, "/usr/vice/etc/CellServDB.local");
            Ok(())
        });
    }

    #[rstest]
    fn seed_can_be_pinned_from_environment() {
        Jail::expect_with(|j| {
            j.set_env("HMTESTER_SEED", "1234");
            let args = normalize_args(["hmtester", "-ncells", "2", "-nruns", "5"]);
            let config = load_config(&args).expect("load");
            assert_eq!(config.seed, Some(1234));
            Ok(())
        });
    }
}
