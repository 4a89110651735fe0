//! SSH control-master lifecycle.
//!
//! One multiplexed connection is opened per remote host during endpoint
//! resolution. Every later invocation for that host reuses the control
//! socket, so a recursive run over dozens of child datasets performs a
//! single TCP and key exchange per endpoint.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::command::TransportError;

/// A persistent multiplexed SSH connection to one remote host.
///
/// The connection stays open until [`SshControl::close`] is called; `Drop`
/// closes it best-effort so a failed run never leaks a master process.
#[derive(Debug)]
pub struct SshControl {
    target: String,
    socket: PathBuf,
    closed: bool,
}

impl SshControl {
    /// Opens the control-master connection for `user@host`.
    ///
    /// The socket path embeds the user, host, and the wall-clock second the
    /// connection was opened: `/tmp/syncoid-<user>-<host>-<unix-seconds>`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when `ssh` cannot be spawned or the
    /// master connection exits non-zero (authentication failure,
    /// unreachable host).
    pub fn open(user: &str, host: &str) -> Result<Self, TransportError> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        let socket = PathBuf::from(format!("/tmp/syncoid-{user}-{host}-{stamp}"));
        let target = format!("{user}@{host}");

        debug!("opening ssh control master for {target} at {}", socket.display());
        let status = Command::new("ssh")
            .arg("-M")
            .arg("-S")
            .arg(&socket)
            .arg("-o")
            .arg("ControlPersist=yes")
            .arg(&target)
            .arg("exit")
            .status()
            .map_err(|source| TransportError::Spawn {
                program: "ssh".to_string(),
                source,
            })?;
        if !status.success() {
            return Err(TransportError::ControlChannel {
                target,
                action: "open",
                status,
            });
        }

        Ok(Self {
            target,
            socket,
            closed: false,
        })
    }

    /// Returns the `user@host` operand this connection serves.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the control socket path shared by all invocations.
    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Sends the control-channel exit command and marks the connection
    /// closed. Calling `close` twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when `ssh` cannot be spawned or the exit
    /// command reports failure.
    pub fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        debug!("closing ssh control master for {}", self.target);
        let status = Command::new("ssh")
            .arg("-S")
            .arg(&self.socket)
            .arg("-O")
            .arg("exit")
            .arg(&self.target)
            .status()
            .map_err(|source| TransportError::Spawn {
                program: "ssh".to_string(),
                source,
            })?;
        if !status.success() {
            return Err(TransportError::ControlChannel {
                target: self.target.clone(),
                action: "close",
                status,
            });
        }
        Ok(())
    }
}

impl Drop for SshControl {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(error) = self.close() {
                warn!("failed to close ssh control master: {error}");
            }
        }
    }
}
