//! Provisioning and teardown of the client under test.
//!
//! The driver installs a server list naming the primary cell and every
//! generated remote cell, restarts the client so it picks the list up, and
//! obtains admin tokens. It holds no state beyond the paths it was given.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tracing::info;

use crate::{
    cell::CellRegistry,
    error::{CommandFailure, TesterError},
    shell::{CommandSpec, Shell},
};

/// Comment written after the primary cell's server address.
const PRIMARY_COMMENT: &str = "#vagrant";
/// Comment written after each remote cell's server address.
const REMOTE_COMMENT: &str = "#server";

/// Line-oriented server list: a `>cell` line followed by an address line
/// for every cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerList {
    primary: String,
    primary_address: String,
    remotes: Vec<String>,
    remote_address: String,
}

impl ServerList {
    /// Build the server list for every cell in `registry`.
    #[must_use]
    pub fn for_registry(registry: &CellRegistry, primary_address: &str, remote_address: &str) -> Self {
        let primary = registry
            .get(registry.primary_index())
            .map(|cell| cell.name.clone())
            .unwrap_or_default();
        Self {
            primary,
            primary_address: primary_address.to_owned(),
            remotes: registry.remote_names().map(str::to_owned).collect(),
            remote_address: remote_address.to_owned(),
        }
    }

    /// Render the file contents.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            ">{}\n{}\t\t{PRIMARY_COMMENT}\n",
            self.primary, self.primary_address
        );
        for remote in &self.remotes {
            out.push_str(&format!(
                ">{remote}\n{}\t\t{REMOTE_COMMENT}\n",
                self.remote_address
            ));
        }
        out
    }
}

fn split_path(path: &Utf8Path) -> io::Result<(&Utf8Path, &str)> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{path} has no file name"))
    })?;
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, name))
}

/// Write `contents` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns any I/O error raised while opening the parent directory or writing
/// the file.
pub fn write_file(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let (parent, name) = split_path(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.write(name, contents)
}

/// Remove the file at `path`.
///
/// # Errors
///
/// Returns any I/O error raised while opening the parent directory or
/// removing the file.
pub fn remove_file(path: &Utf8Path) -> io::Result<()> {
    let (parent, name) = split_path(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.remove_file(name)
}

/// Provisions and tears down the client under test.
pub trait Environment {
    /// Bring the client up with the configured cells.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Setup`] on the first failing step.
    fn setup(&mut self) -> Result<(), TesterError>;

    /// Destroy the client and clean up local files.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Setup`] on the first failing step.
    fn teardown(&mut self) -> Result<(), TesterError>;
}

/// Commands and paths used by [`AfsEnvironment`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentPaths {
    /// Provisioning robot.
    pub robot_bin: String,
    /// Privilege wrapper.
    pub sudo_bin: String,
    /// Init script that restarts the client.
    pub client_init_script: String,
    /// Scratch location of the rendered server list.
    pub server_list_tmp: Utf8PathBuf,
    /// Location the client reads the server list from.
    pub server_list_dest: Utf8PathBuf,
}

/// [`Environment`] driving a real client through `afsrobot`.
#[derive(Debug)]
pub struct AfsEnvironment<S> {
    shell: S,
    paths: EnvironmentPaths,
    server_list: ServerList,
}

impl<S: Shell> AfsEnvironment<S> {
    /// Create a driver that installs `server_list`.
    #[must_use]
    pub const fn new(shell: S, paths: EnvironmentPaths, server_list: ServerList) -> Self {
        Self {
            shell,
            paths,
            server_list,
        }
    }

    fn run(&mut self, action: &'static str, spec: &CommandSpec) -> Result<(), TesterError> {
        self.shell
            .run(spec)
            .map(drop)
            .map_err(|source| TesterError::setup(action, source))
    }

    fn robot(&self, verb: &str) -> CommandSpec { CommandSpec::new(&self.paths.robot_bin).arg(verb) }
}

impl<S: Shell> Environment for AfsEnvironment<S> {
    fn setup(&mut self) -> Result<(), TesterError> {
        let start = self.robot("setup");
        self.run("starting the client", &start)?;

        write_file(&self.paths.server_list_tmp, &self.server_list.render())
            .map_err(|e| TesterError::setup("writing the server list", CommandFailure::Io(e)))?;

        let copy = CommandSpec::new("cp")
            .args([
                self.paths.server_list_tmp.as_str(),
                self.paths.server_list_dest.as_str(),
            ])
            .escalated(&self.paths.sudo_bin);
        self.run("copying the server list", &copy)?;

        let restart = CommandSpec::new(&self.paths.client_init_script)
            .arg("restart")
            .escalated(&self.paths.sudo_bin);
        self.run("restarting the client", &restart)?;

        let login = self.robot("login");
        self.run("obtaining tokens", &login)?;
        info!(
            cells = self.server_list.remotes.len() + 1,
            "client provisioned"
        );
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), TesterError> {
        let nuke = self.robot("teardown");
        self.run("destroying the client", &nuke)?;
        remove_file(&self.paths.server_list_tmp)
            .map_err(|e| TesterError::setup("removing the server list", CommandFailure::Io(e)))?;
        info!("client torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct RecordingShell {
        seen: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl Shell for RecordingShell {
        fn run(&mut self, spec: &CommandSpec) -> Result<String, CommandFailure> {
            let line = spec.to_string();
            let fail = self.fail_on.is_some_and(|needle| line.contains(needle));
            self.seen.push(line);
            if fail {
                return Err(CommandFailure::Output {
                    command: spec.to_string(),
                    output: String::new(),
                });
            }
            Ok(String::new())
        }
    }

    #[fixture]
    fn scratch() -> TempDir { TempDir::new().expect("tempdir") }

    fn paths(dir: &TempDir) -> EnvironmentPaths {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir");
        EnvironmentPaths {
            robot_bin: "afsrobot".to_owned(),
            sudo_bin: "sudo".to_owned(),
            client_init_script: "/etc/init.d/openafs-client".to_owned(),
            server_list_tmp: root.join("CellServDB"),
            server_list_dest: root.join("CellServDB.local"),
        }
    }

    fn server_list() -> ServerList {
        ServerList::for_registry(
            &CellRegistry::new("robotest", 3),
            "192.168.2.129",
            "192.168.2.138",
        )
    }

    #[test]
    fn server_list_renders_primary_then_remotes() {
        assert_eq!(
            server_list().render(),
            ">robotest\n192.168.2.129\t\t#vagrant\n\
             >cellname_1\n192.168.2.138\t\t#server\n\
             >cellname_2\n192.168.2.138\t\t#server\n"
        );
    }

    #[test]
    fn single_cell_server_list_has_only_primary() {
        let list = ServerList::for_registry(&CellRegistry::new("robotest", 1), "a", "b");
        assert_eq!(list.render(), ">robotest\na\t\t#vagrant\n");
    }

    #[rstest]
    fn setup_runs_steps_in_order(scratch: TempDir) {
        let paths = paths(&scratch);
        let mut shell = RecordingShell::default();
        let mut env = AfsEnvironment::new(&mut shell, paths.clone(), server_list());
        env.setup().expect("setup");

        let written = std::fs::read_to_string(paths.server_list_tmp.as_std_path()).expect("written");
        assert_eq!(written, server_list().render());
        assert_eq!(shell.seen.len(), 4);
        assert_eq!(shell.seen.first().map(String::as_str), Some("afsrobot setup"));
        assert!(shell.seen.get(1).is_some_and(|c| c.starts_with("sudo cp ")));
        assert_eq!(
            shell.seen.get(2).map(String::as_str),
            Some("sudo /etc/init.d/openafs-client restart")
        );
        assert_eq!(shell.seen.get(3).map(String::as_str), Some("afsrobot login"));
    }

    #[rstest]
    fn failing_restart_is_a_setup_failure(scratch: TempDir) {
        let mut shell = RecordingShell {
            fail_on: Some("restart"),
            ..RecordingShell::default()
        };
        let mut env = AfsEnvironment::new(&mut shell, paths(&scratch), server_list());
        let err = env.setup().expect_err("must fail");
        assert!(matches!(
            err,
            TesterError::Setup {
                action: "restarting the client",
                ..
            }
        ));
        assert!(!shell.seen.iter().any(|c| c.contains("login")));
    }

    #[rstest]
    fn teardown_removes_scratch_file(scratch: TempDir) {
        let paths = paths(&scratch);
        write_file(&paths.server_list_tmp, "stale").expect("seed file");
        let mut shell = RecordingShell::default();
        let mut env = AfsEnvironment::new(&mut shell, paths.clone(), server_list());
        env.teardown().expect("teardown");
        assert!(!paths.server_list_tmp.exists());
        assert_eq!(shell.seen, ["afsrobot teardown"]);
    }

    #[rstest]
    fn teardown_without_scratch_file_fails(scratch: TempDir) {
        let mut shell = RecordingShell::default();
        let mut env = AfsEnvironment::new(&mut shell, paths(&scratch), server_list());
        assert!(env.teardown().is_err());
    }
}
