//! ZFS control-plane operations and their output parsers.

use syncoid_core::snapshot::Snapshot;
use tracing::{debug, warn};
use transport::{CommandGroup, CommandOutput, CommandSpec, Location};

use crate::ZfsError;

/// Maximum number of destroys bundled into one command group.
///
/// The batch size bounds SSH round trips, not destruction volume.
pub const DESTROY_BATCH: usize = 10;

/// Estimates below this floor are clamped up so the progress meter never
/// shows a nonsensical few-byte total for a real stream.
const ESTIMATE_FLOOR: u64 = 4096;

fn run(location: &Location, argv: Vec<String>, needs_root: bool) -> Result<CommandOutput, ZfsError> {
    Ok(CommandSpec::new(location.clone(), argv, needs_root).run_capture()?)
}

fn fail(action: impl Into<String>, output: &CommandOutput) -> ZfsError {
    ZfsError::CommandFailed {
        action: action.into(),
        status: output.status,
        stderr: output.stderr.trim().to_string(),
    }
}

/// Lists `dataset` and every descendant dataset beneath it.
///
/// The underlying `zfs list -Hr` emits the queried dataset first and the
/// children depth-first, which is the order the recursive driver syncs in.
///
/// # Errors
///
/// Returns [`ZfsError`] when the enumeration cannot be run or exits
/// non-zero.
pub fn list_children(location: &Location, dataset: &str) -> Result<Vec<String>, ZfsError> {
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "list".to_string(),
            "-o".to_string(),
            "name".to_string(),
            "-t".to_string(),
            "filesystem,volume".to_string(),
            "-Hr".to_string(),
            dataset.to_string(),
        ],
        true,
    )?;
    if !output.success() {
        return Err(fail(format!("listing children of {dataset}"), &output));
    }
    Ok(parse_children(&output.stdout))
}

fn parse_children(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Enumerates the depth-1 snapshots of `dataset` with creation times.
///
/// # Errors
///
/// Returns [`ZfsError`] when the enumeration cannot be run or exits
/// non-zero. Individual malformed lines are skipped, not fatal.
pub fn snapshots(location: &Location, dataset: &str) -> Result<Vec<Snapshot>, ZfsError> {
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "get".to_string(),
            "-Hpd".to_string(),
            "1".to_string(),
            "-t".to_string(),
            "snapshot".to_string(),
            "creation".to_string(),
            dataset.to_string(),
        ],
        true,
    )?;
    if !output.success() {
        return Err(fail(format!("listing snapshots of {dataset}"), &output));
    }
    Ok(parse_snapshot_listing(dataset, &output.stdout))
}

fn parse_snapshot_listing(dataset: &str, stdout: &str) -> Vec<Snapshot> {
    let prefix = format!("{dataset}@");
    let mut snapshots = Vec::new();
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(full_name), Some(property), Some(value)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(name) = full_name.strip_prefix(&prefix) else {
            continue;
        };
        if property != "creation" {
            continue;
        }
        match value.parse::<u64>() {
            Ok(ctime) => snapshots.push(Snapshot::new(name, ctime)),
            Err(_) => warn!("skipping snapshot {full_name} with unparsable creation {value:?}"),
        }
    }
    snapshots
}

/// Reads one property of `dataset`.
///
/// # Errors
///
/// Returns [`ZfsError`] when the command fails or the output lacks the
/// expected value field.
pub fn get_prop(location: &Location, dataset: &str, prop: &str) -> Result<String, ZfsError> {
    let action = format!("reading {prop} of {dataset}");
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "get".to_string(),
            "-H".to_string(),
            prop.to_string(),
            dataset.to_string(),
        ],
        true,
    )?;
    if !output.success() {
        return Err(fail(action, &output));
    }
    let line = output.stdout.lines().next().unwrap_or_default();
    parse_prop_value(line).ok_or_else(|| ZfsError::Unparsable {
        action,
        line: line.to_string(),
    })
}

fn parse_prop_value(line: &str) -> Option<String> {
    line.split_whitespace().nth(2).map(str::to_string)
}

/// Writes one property of `dataset`.
///
/// # Errors
///
/// Returns [`ZfsError`] when the command fails.
pub fn set_prop(
    location: &Location,
    dataset: &str,
    prop: &str,
    value: &str,
) -> Result<(), ZfsError> {
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "set".to_string(),
            format!("{prop}={value}"),
            dataset.to_string(),
        ],
        true,
    )?;
    if !output.success() {
        return Err(fail(format!("setting {prop}={value} on {dataset}"), &output));
    }
    Ok(())
}

/// Creates `dataset@name`.
///
/// # Errors
///
/// Returns [`ZfsError`] when the command fails.
pub fn create_snapshot(location: &Location, dataset: &str, name: &str) -> Result<(), ZfsError> {
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "snapshot".to_string(),
            format!("{dataset}@{name}"),
        ],
        true,
    )?;
    if !output.success() {
        return Err(fail(format!("creating snapshot {dataset}@{name}"), &output));
    }
    Ok(())
}

/// Destroys the named snapshots of `dataset` in batched command groups.
///
/// Each group bundles at most [`DESTROY_BATCH`] destroys into a single
/// invocation.
///
/// # Errors
///
/// Returns [`ZfsError`] for the first group that cannot be run or reports
/// failure; earlier groups stay destroyed.
pub fn destroy_snapshots(
    location: &Location,
    dataset: &str,
    names: &[String],
) -> Result<(), ZfsError> {
    for batch in names.chunks(DESTROY_BATCH) {
        let commands = batch
            .iter()
            .map(|name| {
                vec![
                    "zfs".to_string(),
                    "destroy".to_string(),
                    format!("{dataset}@{name}"),
                ]
            })
            .collect();
        let output = CommandGroup::new(location.clone(), commands, true).run_capture()?;
        if !output.success() {
            return Err(fail(
                format!("destroying {} snapshots of {dataset}", batch.len()),
                &output,
            ));
        }
    }
    Ok(())
}

/// Reports whether a `zfs receive` into `dataset` is running at
/// `location`.
///
/// The process table is inherently racy; callers re-check immediately
/// before each send.
///
/// # Errors
///
/// Returns [`ZfsError`] when the process listing itself cannot be
/// obtained.
pub fn receive_in_progress(location: &Location, dataset: &str) -> Result<bool, ZfsError> {
    let output = run(
        location,
        vec![
            "ps".to_string(),
            "-Ao".to_string(),
            "args=".to_string(),
        ],
        false,
    )?;
    if !output.success() {
        return Err(fail(format!("probing receives into {dataset}"), &output));
    }
    Ok(listing_shows_receive(&output.stdout, dataset))
}

fn listing_shows_receive(process_listing: &str, dataset: &str) -> bool {
    process_listing.lines().any(|line| {
        (line.contains("zfs receive") || line.contains("zfs recv")) && line.contains(dataset)
    })
}

/// Reports whether `dataset` exists at `location`.
///
/// # Errors
///
/// Returns [`ZfsError`] only when the probe cannot be spawned; a non-zero
/// exit simply means the dataset is absent.
pub fn dataset_exists(location: &Location, dataset: &str) -> Result<bool, ZfsError> {
    let output = run(
        location,
        vec![
            "zfs".to_string(),
            "get".to_string(),
            "-H".to_string(),
            "name".to_string(),
            dataset.to_string(),
        ],
        true,
    )?;
    if !output.success() {
        return Ok(false);
    }
    Ok(first_field_matches(&output.stdout, dataset))
}

fn first_field_matches(stdout: &str, dataset: &str) -> bool {
    stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        == Some(dataset)
}

/// Estimates the size in bytes of the described send stream.
///
/// Any spawn, exit, or parse failure degrades to zero so the caller can
/// still run the transfer with an `UNKNOWN` progress total. Positive
/// estimates smaller than 4096 bytes are clamped up to 4096.
#[must_use]
pub fn estimate_send(
    location: &Location,
    dataset: &str,
    from: Option<&str>,
    to: &str,
) -> u64 {
    let mut argv = vec!["zfs".to_string(), "send".to_string(), "-nP".to_string()];
    if let Some(from) = from {
        argv.push("-I".to_string());
        argv.push(format!("{dataset}@{from}"));
    }
    argv.push(format!("{dataset}@{to}"));

    let output = match CommandSpec::new(location.clone(), argv, true).run_capture() {
        Ok(output) => output,
        Err(error) => {
            debug!("send size estimate unavailable: {error}");
            return 0;
        }
    };
    if !output.success() {
        debug!(
            "send size estimate for {dataset}@{to} exited {}: {}",
            output.status,
            output.stderr.trim()
        );
        return 0;
    }
    parse_estimate(&output.stdout, &output.stderr)
}

fn parse_estimate(stdout: &str, stderr: &str) -> u64 {
    // `zfs send -nP` prints the summary on stdout on Linux and stderr on
    // some platforms; scan both.
    let size = stdout
        .lines()
        .chain(stderr.lines())
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("size"), Some(value)) => value.parse::<u64>().ok(),
                _ => None,
            }
        })
        .last()
        .unwrap_or(0);
    if size == 0 {
        0
    } else {
        size.max(ESTIMATE_FLOOR)
    }
}
