#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `zfs` exposes the typed ZFS control-plane operations oc-syncoid needs:
//! dataset and snapshot enumeration, property access, snapshot creation and
//! batched destruction, the receive-in-progress probe, and send-size
//! estimation. Every operation shells out to the `zfs` (or `ps`) binary on
//! the addressed location through the [`transport`] crate and parses the
//! machine-readable (`-H`/`-Hp`) output.
//!
//! # Design
//!
//! Parsing is split from process execution: each operation delegates to a
//! pure `parse_*` function over captured text, so the whole surface is unit
//! tested without a ZFS pool. The operations themselves stay thin argv
//! builders.
//!
//! # Invariants
//!
//! - Enumeration lines whose first field does not belong to the queried
//!   dataset are ignored rather than treated as errors.
//! - [`estimate_send`] never fails: any spawn, exit, or parse problem
//!   degrades to an estimate of zero.

mod ops;

pub use ops::{
    create_snapshot, dataset_exists, destroy_snapshots, estimate_send, get_prop, list_children,
    receive_in_progress, set_prop, snapshots, DESTROY_BATCH,
};

use std::process::ExitStatus;

use thiserror::Error;

/// Errors surfaced by ZFS control-plane operations.
#[derive(Debug, Error)]
pub enum ZfsError {
    /// The underlying process could not be run.
    #[error(transparent)]
    Transport(#[from] transport::TransportError),
    /// The command ran but reported failure.
    #[error("{action} failed with {status}: {stderr}")]
    CommandFailed {
        /// Human-readable description of the attempted operation.
        action: String,
        /// Exit status the command reported.
        status: ExitStatus,
        /// Trimmed standard error of the command.
        stderr: String,
    },
    /// The command succeeded but its output had an unexpected shape.
    #[error("{action} produced unparsable output: {line:?}")]
    Unparsable {
        /// Human-readable description of the attempted operation.
        action: String,
        /// The offending output line.
        line: String,
    },
}
