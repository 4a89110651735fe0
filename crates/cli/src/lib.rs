#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `syncoid_cli` is the command-line frontend of oc-syncoid. It parses the
//! option surface, resolves the source and target endpoints, probes the
//! optional helper binaries once, and then drives the per-dataset sync
//! procedure (single dataset, or recursively over every child) before
//! closing the SSH control connections it opened.
//!
//! The crate exposes [`run`] as the primary entry point so the binary and
//! the integration tests share one parsing and dispatch path, mirroring
//! the structure of the sibling `oc-rsync` workspace.

mod arguments;
mod command_builder;
mod error;
mod human;
mod prune;
mod run;
mod sync;

pub mod readonly;

pub use error::SyncError;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode as ProcessExitCode;

/// Runs the CLI with the provided arguments and I/O handles.
///
/// Returns the raw process exit status; use [`exit_code_from`] to convert
/// it for `main`.
pub fn run<I, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator,
    I::Item: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    run::run_with(args, stdout, stderr)
}

/// Converts a raw exit status into [`std::process::ExitCode`], clamping
/// out-of-range values.
#[must_use]
pub fn exit_code_from(status: i32) -> ProcessExitCode {
    let clamped = status.clamp(0, i32::from(u8::MAX));
    ProcessExitCode::from(u8::try_from(clamped).unwrap_or(u8::MAX))
}

/// Test utilities exposed for integration tests.
///
/// **Warning**: not part of the public API; may change without notice.
#[doc(hidden)]
pub mod test_utils {
    pub use crate::arguments::{parse_args, ParsedArgs};
    pub use crate::command_builder::clap_command;
    pub use crate::human::format_bytes;
    pub use crate::run::child_target_path;
}
