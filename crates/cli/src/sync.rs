//! The single-dataset sync procedure.
//!
//! Ordering per dataset: busy probe, target probe, source enumeration,
//! optional target enumeration, sync snapshot mint, optional read-only
//! engage, then for every send step a fresh busy probe followed by the
//! pipeline, then read-only restore and pruning on both sides. A pipeline
//! failure skips pruning so nothing needed for a retry is destroyed.

use std::io::Write;

use tracing::info;

use pipeline::{assemble, execute, CapabilitySet, Compressor, PipelineRequest};
use syncoid_core::plan::{plan_sync, SendStep};
use syncoid_core::snapshot::{Side, SnapshotInventory};
use syncoid_core::sync_name::SyncName;
use transport::Location;

use crate::error::SyncError;
use crate::human::format_bytes;
use crate::prune::prune_sync_snapshots;
use crate::readonly::{ReadonlyGuard, ZfsProperties};

/// Everything shared by every dataset synced in one invocation.
pub(crate) struct SyncContext<'a> {
    pub source: &'a Location,
    pub target: &'a Location,
    pub local: &'a Location,
    pub capabilities: &'a CapabilitySet,
    pub compressor: Option<Compressor>,
    pub source_bwlimit: Option<&'a str>,
    pub target_bwlimit: Option<&'a str>,
    pub hostname: &'a str,
    pub dumpsnaps: bool,
}

/// Replicates one dataset from source to target.
pub(crate) fn sync_dataset<Out: Write>(
    ctx: &SyncContext<'_>,
    source_dataset: &str,
    target_dataset: &str,
    stdout: &mut Out,
) -> Result<(), SyncError> {
    ensure_target_idle(ctx, target_dataset)?;

    let target_exists = zfs::dataset_exists(ctx.target, target_dataset)?;
    let source_snapshots = zfs::snapshots(ctx.source, source_dataset)?;
    let target_snapshots = if target_exists {
        zfs::snapshots(ctx.target, target_dataset)?
    } else {
        Vec::new()
    };
    let inventory = SnapshotInventory::from_listings(source_snapshots, target_snapshots);
    if ctx.dumpsnaps {
        let _ = write!(stdout, "{}", inventory.render_dump());
    }

    let sync_name = SyncName::mint(ctx.hostname);
    info!("taking snapshot {source_dataset}@{}", sync_name.as_str());
    zfs::create_snapshot(ctx.source, source_dataset, sync_name.as_str())?;

    let plan = plan_sync(&inventory, target_exists, sync_name.as_str()).map_err(|source| {
        SyncError::Plan {
            dataset: source_dataset.to_string(),
            source,
        }
    })?;

    let guard = if target_exists {
        Some(ReadonlyGuard::engage(
            ZfsProperties::new(ctx.target.clone()),
            target_dataset,
        )?)
    } else {
        None
    };

    for step in plan.send_steps() {
        run_send_step(ctx, source_dataset, target_dataset, &step)?;
    }

    if let Some(guard) = guard {
        guard.restore()?;
    }

    prune_sync_snapshots(
        ctx.source,
        source_dataset,
        Side::Source,
        ctx.hostname,
        sync_name.as_str(),
    );
    prune_sync_snapshots(
        ctx.target,
        target_dataset,
        Side::Target,
        ctx.hostname,
        sync_name.as_str(),
    );
    Ok(())
}

fn ensure_target_idle(ctx: &SyncContext<'_>, target_dataset: &str) -> Result<(), SyncError> {
    if zfs::receive_in_progress(ctx.target, target_dataset)? {
        return Err(SyncError::TargetBusy(target_dataset.to_string()));
    }
    Ok(())
}

fn run_send_step(
    ctx: &SyncContext<'_>,
    source_dataset: &str,
    target_dataset: &str,
    step: &SendStep,
) -> Result<(), SyncError> {
    // The planning probe is stale by now; re-check before committing.
    ensure_target_idle(ctx, target_dataset)?;

    let estimate = zfs::estimate_send(ctx.source, source_dataset, step.from.as_deref(), &step.to);
    let estimated_bytes = (estimate > 0).then_some(estimate);
    let size_text = estimated_bytes.map_or_else(|| "UNKNOWN".to_string(), format_bytes);
    match &step.from {
        Some(from) => info!(
            "sending incremental {source_dataset}@{from} .. @{} to {target_dataset} (~ {size_text})",
            step.to
        ),
        None => info!(
            "sending full {source_dataset}@{} to new target {target_dataset} (~ {size_text})",
            step.to
        ),
    }

    let request = PipelineRequest {
        source: ctx.source,
        target: ctx.target,
        local: ctx.local,
        source_dataset,
        target_dataset,
        from_snapshot: step.from.as_deref(),
        to_snapshot: &step.to,
        force_receive: step.force_receive,
        estimated_bytes,
        compressor: ctx.compressor,
        capabilities: ctx.capabilities,
        source_bwlimit: ctx.source_bwlimit,
        target_bwlimit: ctx.target_bwlimit,
    };
    execute(&assemble(&request))?;
    Ok(())
}
