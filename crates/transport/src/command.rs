//! Command construction and captured execution.
//!
//! A [`CommandSpec`] names *what* to run and *where*; lowering decides the
//! final argv. Local specs spawn the argv directly; remote specs become an
//! `ssh -S <socket> user@host <quoted string>` invocation. Operations that
//! need root are prefixed with `sudo` whenever the location's user is not
//! already root.

use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::control::SshControl;
use crate::quote::render_argv;

/// Errors produced while spawning or waiting on external commands.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The program could not be spawned at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The SSH control channel could not be opened or closed.
    #[error("ssh control channel {action} for {target} failed with {status}")]
    ControlChannel {
        /// The `user@host` operand involved.
        target: String,
        /// Which control action failed (`open` or `close`).
        action: &'static str,
        /// The exit status `ssh` reported.
        status: ExitStatus,
    },
}

/// Where a command runs: the local machine or a resolved remote host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Location {
    /// The local machine.
    Local {
        /// Whether the current process already runs as root.
        root: bool,
    },
    /// A remote host reached through an open control-master connection.
    Remote {
        /// The `user@host` ssh operand.
        target: String,
        /// Whether the remote login user is root.
        root: bool,
        /// The shared control socket path.
        socket: PathBuf,
    },
}

impl Location {
    /// Builds the local location.
    #[must_use]
    pub fn local(root: bool) -> Self {
        Self::Local { root }
    }

    /// Builds a remote location backed by an open control connection.
    #[must_use]
    pub fn remote(control: &SshControl, root: bool) -> Self {
        Self::Remote {
            target: control.target().to_string(),
            root,
            socket: control.socket().to_path_buf(),
        }
    }

    /// Reports whether this is the local machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Reports whether commands here already run as root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        match self {
            Self::Local { root } | Self::Remote { root, .. } => *root,
        }
    }

    /// Returns the `sudo` prefix required for a root operation here, if
    /// any.
    #[must_use]
    pub fn sudo_prefix(&self, needs_root: bool) -> Option<&'static str> {
        (needs_root && !self.is_root()).then_some("sudo")
    }

    /// Returns the `ssh` program-and-arguments pair that runs
    /// `remote_command` at this location, or `None` for the local machine.
    #[must_use]
    pub fn ssh_argv(&self, remote_command: &str) -> Option<(String, Vec<String>)> {
        match self {
            Self::Local { .. } => None,
            Self::Remote { target, socket, .. } => Some((
                "ssh".to_string(),
                vec![
                    "-S".to_string(),
                    socket.display().to_string(),
                    target.clone(),
                    remote_command.to_string(),
                ],
            )),
        }
    }
}

/// Captured result of a non-streaming command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit status of the process (for remote commands, of `ssh`).
    pub status: ExitStatus,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Reports whether the command exited successfully.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A command addressed to a location, with its root requirement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    location: Location,
    argv: Vec<String>,
    needs_root: bool,
}

impl CommandSpec {
    /// Builds a spec from a location and argv.
    #[must_use]
    pub fn new<S: Into<String>>(
        location: Location,
        argv: impl IntoIterator<Item = S>,
        needs_root: bool,
    ) -> Self {
        Self {
            location,
            argv: argv.into_iter().map(Into::into).collect(),
            needs_root,
        }
    }

    /// Returns the location this command is addressed to.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the final program and argument list.
    ///
    /// Local commands run the argv directly (optionally behind `sudo`);
    /// remote commands become a quoted string operand of `ssh`.
    #[must_use]
    pub fn command_parts(&self) -> (String, Vec<String>) {
        let mut argv: Vec<String> = Vec::with_capacity(self.argv.len() + 1);
        if let Some(sudo) = self.location.sudo_prefix(self.needs_root) {
            argv.push(sudo.to_string());
        }
        argv.extend(self.argv.iter().cloned());

        match self.location.ssh_argv(&render_argv(&argv)) {
            Some(parts) => parts,
            None => {
                let program = argv.remove(0);
                (program, argv)
            }
        }
    }

    /// Renders the invocation for diagnostics.
    #[must_use]
    pub fn rendered(&self) -> String {
        let (program, args) = self.command_parts();
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(program);
        words.extend(args);
        render_argv(&words)
    }

    /// Runs the command and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] when the process cannot be
    /// started. A non-zero exit is not an error here; callers inspect the
    /// returned [`CommandOutput`].
    pub fn run_capture(&self) -> Result<CommandOutput, TransportError> {
        let (program, args) = self.command_parts();
        debug!("running: {}", self.rendered());
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TransportError::Spawn { program, source })?;
        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Convenience constructor for a spec addressed to `location`.
#[must_use]
pub fn spec<S: Into<String>>(
    location: &Location,
    argv: impl IntoIterator<Item = S>,
    needs_root: bool,
) -> CommandSpec {
    CommandSpec::new(location.clone(), argv, needs_root)
}

/// Several commands run as one `; `-joined shell group.
///
/// Groups bound the number of round trips for bulk operations such as
/// batched snapshot destroys: the whole group costs one `ssh` invocation
/// on a remote location and one `sh -c` locally.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandGroup {
    location: Location,
    commands: Vec<Vec<String>>,
    needs_root: bool,
}

impl CommandGroup {
    /// Builds a group from individual argv vectors.
    #[must_use]
    pub fn new(location: Location, commands: Vec<Vec<String>>, needs_root: bool) -> Self {
        Self {
            location,
            commands,
            needs_root,
        }
    }

    /// Renders the `; `-joined shell string, applying the sudo rule to
    /// every member command.
    #[must_use]
    pub fn rendered_group(&self) -> String {
        self.commands
            .iter()
            .map(|argv| {
                let mut words: Vec<String> = Vec::with_capacity(argv.len() + 1);
                if let Some(sudo) = self.location.sudo_prefix(self.needs_root) {
                    words.push(sudo.to_string());
                }
                words.extend(argv.iter().cloned());
                render_argv(&words)
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns the final program and argument list.
    #[must_use]
    pub fn command_parts(&self) -> (String, Vec<String>) {
        let group = self.rendered_group();
        match self.location.ssh_argv(&group) {
            Some(parts) => parts,
            None => ("sh".to_string(), vec!["-c".to_string(), group]),
        }
    }

    /// Runs the group and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] when the shell or `ssh` cannot be
    /// started.
    pub fn run_capture(&self) -> Result<CommandOutput, TransportError> {
        let (program, args) = self.command_parts();
        debug!("running group: {}", self.rendered_group());
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TransportError::Spawn { program, source })?;
        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandSpec, Location};
    use std::path::PathBuf;

    fn remote_location(user_root: bool) -> Location {
        Location::Remote {
            target: if user_root {
                "root@nas".to_string()
            } else {
                "backup@nas".to_string()
            },
            root: user_root,
            socket: PathBuf::from("/tmp/syncoid-backup-nas-1700000000"),
        }
    }

    #[test]
    fn local_root_command_runs_argv_directly() {
        let spec = CommandSpec::new(Location::local(true), ["zfs", "list"], true);
        let (program, args) = spec.command_parts();
        assert_eq!(program, "zfs");
        assert_eq!(args, vec!["list"]);
    }

    #[test]
    fn local_unprivileged_root_command_gets_sudo() {
        let spec = CommandSpec::new(Location::local(false), ["zfs", "list"], true);
        let (program, args) = spec.command_parts();
        assert_eq!(program, "sudo");
        assert_eq!(args, vec!["zfs", "list"]);
    }

    #[test]
    fn local_non_root_command_skips_sudo() {
        let spec = CommandSpec::new(Location::local(false), ["ps", "-Ao", "args="], false);
        let (program, _) = spec.command_parts();
        assert_eq!(program, "ps");
    }

    #[test]
    fn remote_command_wraps_in_ssh_with_socket() {
        let spec = CommandSpec::new(remote_location(true), ["zfs", "list"], true);
        let (program, args) = spec.command_parts();
        assert_eq!(program, "ssh");
        assert_eq!(
            args,
            vec![
                "-S",
                "/tmp/syncoid-backup-nas-1700000000",
                "root@nas",
                "zfs list",
            ]
        );
    }

    #[test]
    fn remote_unprivileged_command_gets_sudo_inside_the_remote_string() {
        let spec = CommandSpec::new(
            remote_location(false),
            ["zfs", "destroy", "tank@old snap"],
            true,
        );
        let (_, args) = spec.command_parts();
        assert_eq!(args[3], "sudo zfs destroy 'tank@old snap'");
    }

    #[test]
    fn rendered_is_shell_ready() {
        let spec = CommandSpec::new(Location::local(true), ["zfs", "get", "-H", "name"], true);
        assert_eq!(spec.rendered(), "zfs get -H name");
    }

    #[test]
    fn local_group_runs_under_sh() {
        let group = super::CommandGroup::new(
            Location::local(true),
            vec![
                vec!["zfs".to_string(), "destroy".to_string(), "tank@a".to_string()],
                vec!["zfs".to_string(), "destroy".to_string(), "tank@b".to_string()],
            ],
            true,
        );
        let (program, args) = group.command_parts();
        assert_eq!(program, "sh");
        assert_eq!(args[0], "-c");
        assert_eq!(args[1], "zfs destroy tank@a; zfs destroy tank@b");
    }

    #[test]
    fn remote_group_is_one_ssh_invocation_with_sudo_per_command() {
        let group = super::CommandGroup::new(
            remote_location(false),
            vec![
                vec!["zfs".to_string(), "destroy".to_string(), "tank@a".to_string()],
                vec!["zfs".to_string(), "destroy".to_string(), "tank@b".to_string()],
            ],
            true,
        );
        let (program, args) = group.command_parts();
        assert_eq!(program, "ssh");
        assert_eq!(args[3], "sudo zfs destroy tank@a; sudo zfs destroy tank@b");
    }
}
