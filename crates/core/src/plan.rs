//! Replication plan selection.
//!
//! Given the pre-run snapshot inventory, the existence of the target
//! dataset, and the name of the sync snapshot minted for this run, the
//! planner decides between three shapes of replication. Selection is a pure
//! function so every branch is reachable from unit tests.

use thiserror::Error;

use crate::snapshot::{Snapshot, SnapshotInventory};

/// Errors produced while selecting a replication plan.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PlanError {
    /// The target dataset exists but shares no snapshot with the source.
    #[error("target exists but shares no snapshot with the source; cannot replicate incrementally")]
    NoCommonSnapshot,
}

/// One `zfs send | zfs receive` invocation derived from a plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendStep {
    /// Incremental base snapshot; `None` for a full send.
    pub from: Option<String>,
    /// Snapshot the stream ends at.
    pub to: String,
    /// Whether the receiver is forced with `-F`.
    pub force_receive: bool,
}

impl SendStep {
    fn full(to: impl Into<String>) -> Self {
        Self {
            from: None,
            to: to.into(),
            force_receive: true,
        }
    }

    fn incremental(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            force_receive: false,
        }
    }
}

/// The replication plan for one dataset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Plan {
    /// Bootstrap a target that does not exist, where the sync snapshot
    /// minted this run is the only source snapshot.
    InitialOnly {
        /// The sync snapshot that seeds the target.
        oldest: String,
    },
    /// Bootstrap a target that does not exist from the oldest source
    /// snapshot, then catch up to the sync snapshot minted this run.
    InitialThenIncremental {
        /// The oldest pre-existing source snapshot.
        oldest: String,
        /// The sync snapshot minted this run.
        new_sync: String,
    },
    /// Send the delta between the most recent common snapshot and the sync
    /// snapshot minted this run.
    IncrementalFromMatch {
        /// The matching snapshot shared by both sides.
        matched: Snapshot,
        /// The sync snapshot minted this run.
        new_sync: String,
    },
}

impl Plan {
    /// Returns the ordered send steps this plan executes.
    #[must_use]
    pub fn send_steps(&self) -> Vec<SendStep> {
        match self {
            Plan::InitialOnly { oldest } => vec![SendStep::full(oldest.clone())],
            Plan::InitialThenIncremental { oldest, new_sync } => vec![
                SendStep::full(oldest.clone()),
                SendStep::incremental(oldest.clone(), new_sync.clone()),
            ],
            Plan::IncrementalFromMatch { matched, new_sync } => {
                vec![SendStep::incremental(matched.name.clone(), new_sync.clone())]
            }
        }
    }
}

/// Selects the replication plan for one dataset.
///
/// `inventory` holds the snapshots observed before the sync snapshot
/// `new_sync` was minted; the planner therefore treats `new_sync` as the
/// newest snapshot on the source without ever finding it in the inventory.
///
/// # Errors
///
/// Returns [`PlanError::NoCommonSnapshot`] when the target exists but no
/// snapshot name exists on both sides with equal creation times.
pub fn plan_sync(
    inventory: &SnapshotInventory,
    target_exists: bool,
    new_sync: &str,
) -> Result<Plan, PlanError> {
    if !target_exists {
        return Ok(match inventory.oldest_source() {
            Some(oldest) => Plan::InitialThenIncremental {
                oldest: oldest.name,
                new_sync: new_sync.to_string(),
            },
            None => Plan::InitialOnly {
                oldest: new_sync.to_string(),
            },
        });
    }

    match inventory.most_recent_common() {
        Some(matched) => Ok(Plan::IncrementalFromMatch {
            matched,
            new_sync: new_sync.to_string(),
        }),
        None => Err(PlanError::NoCommonSnapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_sync, Plan, PlanError};
    use crate::snapshot::{Snapshot, SnapshotInventory};

    fn inventory(source: &[(&str, u64)], target: &[(&str, u64)]) -> SnapshotInventory {
        SnapshotInventory::from_listings(
            source
                .iter()
                .map(|(name, ctime)| Snapshot::new(*name, *ctime))
                .collect(),
            target
                .iter()
                .map(|(name, ctime)| Snapshot::new(*name, *ctime))
                .collect(),
        )
    }

    #[test]
    fn absent_target_with_empty_source_bootstraps_from_new_sync() {
        let plan = plan_sync(&inventory(&[], &[]), false, "sync").expect("plan");
        assert_eq!(
            plan,
            Plan::InitialOnly {
                oldest: "sync".to_string()
            }
        );
        let steps = plan.send_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from, None);
        assert!(steps[0].force_receive);
    }

    #[test]
    fn absent_target_bootstraps_from_oldest_then_catches_up() {
        let plan = plan_sync(
            &inventory(&[("old", 100), ("newer", 200)], &[]),
            false,
            "sync",
        )
        .expect("plan");
        assert_eq!(
            plan,
            Plan::InitialThenIncremental {
                oldest: "old".to_string(),
                new_sync: "sync".to_string()
            }
        );
        let steps = plan.send_steps();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].force_receive);
        assert_eq!(steps[1].from.as_deref(), Some("old"));
        assert_eq!(steps[1].to, "sync");
        assert!(!steps[1].force_receive);
    }

    #[test]
    fn present_target_uses_most_recent_common_match() {
        let plan = plan_sync(
            &inventory(
                &[("a", 10), ("b", 20), ("c", 30)],
                &[("a", 10), ("c", 30)],
            ),
            true,
            "sync",
        )
        .expect("plan");
        assert_eq!(
            plan,
            Plan::IncrementalFromMatch {
                matched: Snapshot::new("c", 30),
                new_sync: "sync".to_string()
            }
        );
        let steps = plan.send_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from.as_deref(), Some("c"));
        assert!(!steps[0].force_receive);
    }

    #[test]
    fn ctime_mismatch_is_not_a_match() {
        let err = plan_sync(&inventory(&[("a", 10)], &[("a", 11)]), true, "sync")
            .expect_err("mismatched ctimes share nothing");
        assert_eq!(err, PlanError::NoCommonSnapshot);
    }

    #[test]
    fn present_target_without_match_fails() {
        let err = plan_sync(&inventory(&[("a", 10)], &[("b", 20)]), true, "sync")
            .expect_err("nothing shared");
        assert_eq!(err, PlanError::NoCommonSnapshot);
    }

    #[test]
    fn tie_on_ctime_picks_lexically_greatest_match() {
        let plan = plan_sync(
            &inventory(
                &[("alpha", 30), ("beta", 30)],
                &[("alpha", 30), ("beta", 30)],
            ),
            true,
            "sync",
        )
        .expect("plan");
        assert_eq!(
            plan,
            Plan::IncrementalFromMatch {
                matched: Snapshot::new("beta", 30),
                new_sync: "sync".to_string()
            }
        );
    }
}
