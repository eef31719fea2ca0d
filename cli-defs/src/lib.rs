//! Shared CLI type definitions for hmtester build and runtime.
//!
//! This crate provides the argument and configuration types used by both the
//! `build.rs` script (for man page generation) and the `hmtester` binary.
//! Keeping them in a separate crate means the build script does not have to
//! compile the tester itself.

// FIXME: File-wide suppressions are unavoidable here. Clap and OrthoConfig derive macros
// inject generated code throughout the module, and there is no mechanism to narrow
// the scope without restructuring the crate.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![expect(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Name of the primary cell the client is provisioned into.
pub const DEFAULT_PRIMARY_CELL: &str = "robotest";
/// Database server address advertised for the primary cell.
pub const DEFAULT_PRIMARY_ADDRESS: &str = "192.168.2.129";
/// Database server address advertised for every generated remote cell.
pub const DEFAULT_REMOTE_ADDRESS: &str = "192.168.2.138";
/// Scratch location the server list is rendered to before installation.
pub const DEFAULT_SERVER_LIST_TMP: &str = "/tmp/CellServDB";
/// Location the client reads its local server list from.
pub const DEFAULT_SERVER_LIST_DEST: &str = "/usr/vice/etc/CellServDB.local";
/// Path of the `fs` administrative command.
pub const DEFAULT_FS_BIN: &str = "/usr/afs/bin/fs";
/// Init script used to restart the client.
pub const DEFAULT_CLIENT_INIT_SCRIPT: &str = "/etc/init.d/openafs-client";

/// Runtime configuration for a tester run.
///
/// Values are layered by `OrthoConfig`: built-in defaults, then
/// `.hmtester.toml`, then `HMTESTER_*` environment variables, then the
/// command line.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "HMTESTER_")]
pub struct TesterConfig {
    /// Number of cells, including the primary cell.
    #[arg(long)]
    pub ncells: usize,
    /// Number of random operations to issue.
    #[arg(long)]
    pub nruns: usize,
    /// Pin the operation planner seed instead of deriving it from the clock.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Name of the primary cell.
    #[ortho_config(default = DEFAULT_PRIMARY_CELL.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_PRIMARY_CELL))]
    pub primary_cell: String,
    /// Server address written for the primary cell.
    #[ortho_config(default = DEFAULT_PRIMARY_ADDRESS.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_PRIMARY_ADDRESS))]
    pub primary_address: String,
    /// Server address written for each remote cell.
    #[ortho_config(default = DEFAULT_REMOTE_ADDRESS.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_REMOTE_ADDRESS))]
    pub remote_address: String,
    /// Scratch path for the rendered server list.
    #[ortho_config(default = DEFAULT_SERVER_LIST_TMP.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_SERVER_LIST_TMP))]
    pub server_list_tmp: String,
    /// Destination of the server list inside the client configuration.
    #[ortho_config(default = DEFAULT_SERVER_LIST_DEST.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_SERVER_LIST_DEST))]
    pub server_list_dest: String,
    /// `fs` administrative binary.
    #[ortho_config(default = DEFAULT_FS_BIN.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_FS_BIN))]
    pub fs_bin: String,
    /// `sysctl` binary.
    #[ortho_config(default = "sysctl".to_owned())]
    #[arg(long, default_value_t = String::from("sysctl"))]
    pub sysctl_bin: String,
    /// Privilege escalation wrapper.
    #[ortho_config(default = "sudo".to_owned())]
    #[arg(long, default_value_t = String::from("sudo"))]
    pub sudo_bin: String,
    /// Provisioning robot used for setup, login, and teardown.
    #[ortho_config(default = "afsrobot".to_owned())]
    #[arg(long, default_value_t = String::from("afsrobot"))]
    pub robot_bin: String,
    /// Init script that restarts the client.
    #[ortho_config(default = DEFAULT_CLIENT_INIT_SCRIPT.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_CLIENT_INIT_SCRIPT))]
    pub client_init_script: String,
    /// Write a JSON copy of the verification report to this path.
    #[arg(long)]
    pub report_json: Option<String>,
}

/// Top-level CLI entry point consumed by the binary and the man page build.
#[derive(Parser, Serialize, Deserialize, Debug, Clone)]
#[command(
    name = "hmtester",
    about = "Randomized differential tester for per-cell hardmount configuration"
)]
pub struct Cli {
    /// Tester configuration.
    #[command(flatten)]
    pub config: TesterConfig,
}
