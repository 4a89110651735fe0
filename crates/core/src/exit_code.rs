//! Centralized exit code definitions for the oc-syncoid binary.
//!
//! Every fatal error kind maps to a distinct process exit status so wrapper
//! scripts and schedulers can distinguish a busy target from a planning
//! failure without parsing diagnostics. Non-fatal conditions (missing
//! capabilities, prune failures, unavailable estimates) never surface here.

use std::fmt;

/// Exit codes returned by an oc-syncoid invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful completion.
    Ok = 0,

    /// Syntax or usage error.
    ///
    /// Returned for malformed endpoints, unknown options, or a surplus
    /// positional operand. Always raised before any side effect.
    Syntax = 1,

    /// The target dataset is currently receiving a stream.
    ///
    /// A send is never started against a dataset with an in-flight
    /// `zfs receive`.
    TargetBusy = 2,

    /// The target exists but shares no snapshot with the source.
    ///
    /// Incremental replication has no anchor; the run stops without
    /// transferring anything.
    NoCommonSnapshot = 3,

    /// The send/receive process group returned non-zero.
    Pipeline = 4,

    /// An external command could not be run or reported failure.
    ///
    /// Covers SSH control-channel setup, enumeration, and property access
    /// failures surfaced by the ZFS control plane.
    Command = 5,

    /// A termination signal interrupted the run.
    ///
    /// The pipeline process group was reaped and the target's properties
    /// restored before exiting.
    Interrupted = 6,
}

impl ExitCode {
    /// Returns the raw status handed to the operating system.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short human-readable description of the exit condition.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            ExitCode::Ok => "success",
            ExitCode::Syntax => "syntax or usage error",
            ExitCode::TargetBusy => "target dataset is receiving",
            ExitCode::NoCommonSnapshot => "no common snapshot with target",
            ExitCode::Pipeline => "send/receive pipeline failed",
            ExitCode::Command => "external command failed",
            ExitCode::Interrupted => "interrupted by signal",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::ExitCode;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Ok.as_i32(), 0);
        assert_eq!(ExitCode::Syntax.as_i32(), 1);
        assert_eq!(ExitCode::TargetBusy.as_i32(), 2);
        assert_eq!(ExitCode::NoCommonSnapshot.as_i32(), 3);
        assert_eq!(ExitCode::Pipeline.as_i32(), 4);
        assert_eq!(ExitCode::Command.as_i32(), 5);
        assert_eq!(ExitCode::Interrupted.as_i32(), 6);
    }

    #[test]
    fn display_includes_description() {
        let rendered = ExitCode::TargetBusy.to_string();
        assert!(rendered.contains('2'));
        assert!(rendered.contains("receiving"));
    }
}
