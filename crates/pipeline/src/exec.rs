//! Lowering hops to processes and supervising the process group.
//!
//! A remote hop becomes a single `ssh` invocation whose operand joins the
//! hop's stages with ` | ` for the remote shell; every local stage becomes
//! its own process. The resulting process list is wired stdout→stdin with
//! OS pipes so data flows concurrently through every stage.

use std::io;
use std::process::{ChildStdout, Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;
use transport::quote::render_argv;

use crate::assemble::Pipeline;

/// Errors produced while running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A member process could not be spawned.
    #[error("failed to spawn pipeline stage {stage}: {source}")]
    Spawn {
        /// Rendered invocation of the stage.
        stage: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// A member process could not be waited on.
    #[error("failed to wait on pipeline stage {stage}: {source}")]
    Wait {
        /// Rendered invocation of the stage.
        stage: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// A member process did not expose the expected pipe end.
    #[error("pipeline stage {stage} did not expose a readable stdout")]
    MissingStdout {
        /// Rendered invocation of the stage.
        stage: String,
    },
    /// A member process exited non-zero.
    #[error("pipeline stage {stage} exited with {status}")]
    StageFailed {
        /// Rendered invocation of the first failing stage.
        stage: String,
        /// Its exit status.
        status: ExitStatus,
    },
    /// A termination signal interrupted the transfer.
    ///
    /// The remaining members of the process group were killed and reaped
    /// before this error was returned.
    #[error("transfer interrupted by signal")]
    Interrupted,
}

/// One concrete process of the lowered pipeline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoweredCommand {
    /// Program to spawn.
    pub program: String,
    /// Arguments to the program.
    pub args: Vec<String>,
    /// Human-readable rendering for diagnostics.
    pub display: String,
}

/// Lowers a pipeline to its ordered process list.
#[must_use]
pub fn lower(pipeline: &Pipeline) -> Vec<LoweredCommand> {
    let mut commands = Vec::new();
    for hop in &pipeline.hops {
        if hop.location.is_local() {
            for stage in &hop.stages {
                let mut argv: Vec<String> = Vec::new();
                if let Some(sudo) = hop.location.sudo_prefix(stage.needs_root()) {
                    argv.push(sudo.to_string());
                }
                argv.extend(stage.argv());
                let display = render_argv(&argv);
                let program = argv.remove(0);
                commands.push(LoweredCommand {
                    program,
                    args: argv,
                    display,
                });
            }
        } else {
            let remote = hop
                .stages
                .iter()
                .map(|stage| {
                    let mut argv: Vec<String> = Vec::new();
                    if let Some(sudo) = hop.location.sudo_prefix(stage.needs_root()) {
                        argv.push(sudo.to_string());
                    }
                    argv.extend(stage.argv());
                    render_argv(&argv)
                })
                .collect::<Vec<_>>()
                .join(" | ");
            let (program, args) = hop
                .location
                .ssh_argv(&remote)
                .expect("remote hop location yields ssh parts");
            let mut display_words = vec![program.clone()];
            display_words.extend(args.iter().cloned());
            commands.push(LoweredCommand {
                program,
                args,
                display: render_argv(&display_words),
            });
        }
    }
    commands
}

/// Renders the whole pipeline for diagnostics.
#[must_use]
pub fn render(pipeline: &Pipeline) -> String {
    lower(pipeline)
        .iter()
        .map(|command| command.display.clone())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Runs the pipeline to completion.
///
/// All stages run concurrently; stderr is inherited so the progress meter
/// stays visible. Every child is waited on even after a failure so no
/// zombie outlives the call.
///
/// # Errors
///
/// Returns [`PipelineError`] when a stage cannot be spawned or the first
/// (in stream order) stage exits non-zero.
pub fn execute(pipeline: &Pipeline) -> Result<(), PipelineError> {
    let commands = lower(pipeline);
    debug!("pipeline: {}", render(pipeline));

    let mut children: Vec<(String, std::process::Child)> = Vec::with_capacity(commands.len());
    let mut upstream: Option<ChildStdout> = None;
    for (index, lowered) in commands.iter().enumerate() {
        let last = index + 1 == commands.len();
        let mut command = Command::new(&lowered.program);
        command.args(&lowered.args);
        match upstream.take() {
            Some(stdout) => {
                command.stdin(Stdio::from(stdout));
            }
            None => {
                command.stdin(Stdio::null());
            }
        }
        command.stdout(if last { Stdio::inherit() } else { Stdio::piped() });

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                // Reap whatever already started before reporting.
                for (_, mut running) in children {
                    let _ = running.kill();
                    let _ = running.wait();
                }
                return Err(PipelineError::Spawn {
                    stage: lowered.display.clone(),
                    source,
                });
            }
        };
        if !last {
            match child.stdout.take() {
                Some(stdout) => upstream = Some(stdout),
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    for (_, mut running) in children {
                        let _ = running.kill();
                        let _ = running.wait();
                    }
                    return Err(PipelineError::MissingStdout {
                        stage: lowered.display.clone(),
                    });
                }
            }
        }
        children.push((lowered.display.clone(), child));
    }

    let mut failure = None;
    let mut interrupted = false;
    let mut index = 0;
    while index < children.len() {
        let wait_result = children[index].1.wait();
        match wait_result {
            Ok(status) => {
                if !status.success() && !interrupted && failure.is_none() {
                    failure = Some(PipelineError::StageFailed {
                        stage: children[index].0.clone(),
                        status,
                    });
                }
                index += 1;
            }
            Err(source) if source.kind() == io::ErrorKind::Interrupted => {
                // A shutdown signal arrived mid-transfer: take down the
                // rest of the process group, then keep reaping.
                interrupted = true;
                for (_, remaining) in children.iter_mut().skip(index) {
                    let _ = remaining.kill();
                }
            }
            Err(source) => {
                if failure.is_none() {
                    failure = Some(PipelineError::Wait {
                        stage: children[index].0.clone(),
                        source,
                    });
                }
                index += 1;
            }
        }
    }

    if interrupted {
        return Err(PipelineError::Interrupted);
    }
    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
