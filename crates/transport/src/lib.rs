#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `transport` turns abstract command requests into concrete process
//! invocations for the oc-syncoid workspace. A command addressed to a
//! remote location is wrapped in an `ssh` invocation that reuses the
//! persistent control-master connection opened during endpoint resolution;
//! a command addressed to the local machine is spawned directly. Either way
//! the `sudo` prefix is applied when the operation needs root and the
//! location's user is not root.
//!
//! # Design
//!
//! - [`control`] owns the SSH control-master lifecycle: one multiplexed
//!   connection per remote host, identified by a `/tmp/syncoid-…` socket,
//!   closed explicitly at shutdown with a `Drop` backstop.
//! - [`command`] lowers a [`CommandSpec`] to a `std::process::Command` and
//!   captures output for the non-streaming control-plane calls.
//! - [`quote`] renders argv vectors into the single-quoted strings handed
//!   to the remote shell.
//!
//! # Invariants
//!
//! - Every remote invocation carries `-S <socket>` so no command performs
//!   its own TCP handshake after resolution.
//! - Rendered remote strings round-trip through POSIX shell word splitting.

pub mod command;
pub mod control;
pub mod quote;

pub use command::{CommandGroup, CommandOutput, CommandSpec, Location, TransportError};
pub use control::SshControl;
