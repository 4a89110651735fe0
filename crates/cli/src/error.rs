//! The orchestrator's error type and its exit-code mapping.

use thiserror::Error;

use pipeline::PipelineError;
use syncoid_core::endpoint::EndpointParseError;
use syncoid_core::exit_code::ExitCode;
use syncoid_core::plan::PlanError;
use transport::TransportError;
use zfs::ZfsError;

/// Fatal errors surfaced by a replication run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The command line was structurally valid but unusable.
    #[error("{0}")]
    Usage(String),
    /// An endpoint operand could not be parsed.
    #[error(transparent)]
    Endpoint(#[from] EndpointParseError),
    /// The target dataset is receiving a stream right now.
    #[error("target dataset {0} is currently receiving; not syncing")]
    TargetBusy(String),
    /// Plan selection failed for a dataset.
    #[error("{dataset}: {source}")]
    Plan {
        /// The source dataset being planned.
        dataset: String,
        /// The underlying planner error.
        source: PlanError,
    },
    /// The send/receive process group failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// A ZFS control-plane operation failed.
    #[error(transparent)]
    Zfs(#[from] ZfsError),
    /// An SSH control channel or process spawn failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// Maps the error to its process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SyncError::Usage(_) | SyncError::Endpoint(_) => ExitCode::Syntax,
            SyncError::TargetBusy(_) => ExitCode::TargetBusy,
            SyncError::Plan { .. } => ExitCode::NoCommonSnapshot,
            SyncError::Pipeline(PipelineError::Interrupted) => ExitCode::Interrupted,
            SyncError::Pipeline(_) => ExitCode::Pipeline,
            SyncError::Zfs(_) | SyncError::Transport(_) => ExitCode::Command,
        }
    }

    /// Reports whether the error was caused by a shutdown signal.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, SyncError::Pipeline(PipelineError::Interrupted))
    }
}
