//! Top-level dispatch: parsing, endpoint resolution, capability probing,
//! and the recursive driver.

use std::ffi::OsString;
use std::io::Write;

use clap::error::ErrorKind;
use tracing::{error, warn, Level};

use pipeline::{compressor, CapabilitySet, Compressor};
use syncoid_core::endpoint::{process_is_root, Endpoint};
use syncoid_core::exit_code::ExitCode;
use syncoid_core::signal;
use syncoid_core::sync_name::local_hostname;
use syncoid_core::version::{version_banner, PROGRAM_NAME};
use transport::{Location, SshControl};

use crate::arguments::{parse_args, ParsedArgs};
use crate::command_builder::clap_command;
use crate::error::SyncError;
use crate::sync::{sync_dataset, SyncContext};

pub(crate) fn run_with<Out: Write, Err: Write>(
    args: Vec<OsString>,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32 {
    let matches = match clap_command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(parse_error) => {
            return if parse_error.kind() == ErrorKind::DisplayHelp {
                let _ = write!(stdout, "{parse_error}");
                ExitCode::Ok.as_i32()
            } else {
                let _ = write!(stderr, "{parse_error}");
                ExitCode::Syntax.as_i32()
            };
        }
    };
    let parsed = parse_args(&matches);

    if parsed.show_version {
        let _ = writeln!(stdout, "{}", version_banner());
        return ExitCode::Ok.as_i32();
    }

    init_tracing(parsed.debug);
    signal::install_handlers();

    match execute(&parsed, stdout) {
        Ok(code) => code.as_i32(),
        Err(sync_error) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME}: {sync_error}");
            sync_error.exit_code().as_i32()
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();
}

fn execute<Out: Write>(args: &ParsedArgs, stdout: &mut Out) -> Result<ExitCode, SyncError> {
    let (Some(source_raw), Some(target_raw)) = (&args.source, &args.target) else {
        return Err(SyncError::Usage(
            "a source and a target endpoint are required".to_string(),
        ));
    };
    let source = Endpoint::parse(source_raw)?;
    let target = Endpoint::parse(target_raw)?;

    let chosen_compressor = match &args.compress {
        Some(choice) => compressor::parse_choice(choice),
        None => Some(Compressor::default_choice()),
    };

    let mut controls: Vec<SshControl> = Vec::new();
    let source_location = resolve_location(&source, &mut controls)?;
    let target_location = resolve_location(&target, &mut controls)?;
    let local = Location::local(process_is_root());

    let capabilities = if args.nocommandchecks {
        CapabilitySet::assume_all()
    } else {
        CapabilitySet::probe(&source_location, &target_location, &local, chosen_compressor)
    };
    let hostname = local_hostname();

    let pairs: Vec<(String, String)> = if args.recursive {
        zfs::list_children(&source_location, source.dataset())?
            .into_iter()
            .map(|child| {
                let target_path = child_target_path(source.dataset(), target.dataset(), &child);
                (child, target_path)
            })
            .collect()
    } else {
        vec![(source.dataset().to_string(), target.dataset().to_string())]
    };

    let ctx = SyncContext {
        source: &source_location,
        target: &target_location,
        local: &local,
        capabilities: &capabilities,
        compressor: chosen_compressor,
        source_bwlimit: args.source_bwlimit.as_deref(),
        target_bwlimit: args.target_bwlimit.as_deref(),
        hostname: &hostname,
        dumpsnaps: args.dumpsnaps,
    };

    let single = pairs.len() == 1;
    let mut failure: Option<ExitCode> = None;
    for (source_dataset, target_dataset) in &pairs {
        if let Err(sync_error) = sync_dataset(&ctx, source_dataset, target_dataset, stdout) {
            if single || sync_error.is_interrupted() {
                close_controls(&mut controls);
                return Err(sync_error);
            }
            // Recursive runs finish the remaining children; the exit
            // status still reflects the first failure.
            error!("sync of {source_dataset} failed: {sync_error}");
            failure.get_or_insert(sync_error.exit_code());
        }
        if signal::shutdown_requested() {
            close_controls(&mut controls);
            return Err(SyncError::Pipeline(pipeline::PipelineError::Interrupted));
        }
    }

    close_controls(&mut controls);
    Ok(failure.unwrap_or(ExitCode::Ok))
}

fn resolve_location(
    endpoint: &Endpoint,
    controls: &mut Vec<SshControl>,
) -> Result<Location, SyncError> {
    match endpoint.remote() {
        Some(remote) => {
            let control = SshControl::open(remote.user(), remote.host())?;
            let location = Location::remote(&control, remote.is_root());
            controls.push(control);
            Ok(location)
        }
        None => Ok(Location::local(process_is_root())),
    }
}

fn close_controls(controls: &mut Vec<SshControl>) {
    for control in controls.iter_mut() {
        if let Err(close_error) = control.close() {
            warn!("{close_error}");
        }
    }
}

/// Maps a source child dataset onto the target tree by suffix
/// substitution.
pub fn child_target_path(source_dataset: &str, target_dataset: &str, child: &str) -> String {
    match child.strip_prefix(source_dataset) {
        Some(suffix) => format!("{target_dataset}{suffix}"),
        None => target_dataset.to_string(),
    }
}
