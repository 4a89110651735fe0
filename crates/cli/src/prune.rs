//! Pruning of historic sync snapshots after a successful transfer.

use tracing::{info, warn};
use transport::Location;
use zfs::DESTROY_BATCH;

use syncoid_core::snapshot::Side;
use syncoid_core::sync_name::is_prunable_name;

/// Destroys this host's stale sync snapshots on one side.
///
/// Only names carrying the `syncoid_<hostname>_` prefix for the current
/// hostname are considered, and the snapshot minted by this run is always
/// kept. Failures are logged per batch and never propagate: a failed prune
/// costs disk space, not correctness.
pub(crate) fn prune_sync_snapshots(
    location: &Location,
    dataset: &str,
    side: Side,
    hostname: &str,
    keep: &str,
) {
    let snapshots = match zfs::snapshots(location, dataset) {
        Ok(snapshots) => snapshots,
        Err(error) => {
            warn!("skipping {side} prune of {dataset}: {error}");
            return;
        }
    };

    let stale: Vec<String> = snapshots
        .into_iter()
        .filter(|snapshot| is_prunable_name(&snapshot.name, hostname, keep))
        .map(|snapshot| snapshot.name)
        .collect();
    if stale.is_empty() {
        return;
    }

    info!(
        "pruning {} stale sync snapshot(s) of {dataset} on {side}",
        stale.len()
    );
    for batch in stale.chunks(DESTROY_BATCH) {
        if let Err(error) = zfs::destroy_snapshots(location, dataset, batch) {
            warn!("prune batch on {side} {dataset} failed: {error}");
        }
    }
}
