//! Snapshot listings and the merged two-sided inventory.

use std::collections::BTreeMap;
use std::fmt;

/// Which side of the replication a snapshot was observed on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    /// The dataset being sent from.
    Source,
    /// The dataset being received into.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Target => "target",
        })
    }
}

/// A snapshot name paired with its creation time.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Snapshot {
    /// The short snapshot name (the part after `@`).
    pub name: String,
    /// Creation time in seconds since the epoch.
    pub ctime: u64,
}

impl Snapshot {
    /// Constructs a snapshot record.
    #[must_use]
    pub fn new(name: impl Into<String>, ctime: u64) -> Self {
        Self {
            name: name.into(),
            ctime,
        }
    }
}

/// The merged snapshot inventory of both replication sides.
///
/// Maps are keyed by snapshot name; iteration order is therefore
/// deterministic regardless of enumeration order. Matching between sides
/// requires both name equality and creation-time equality.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SnapshotInventory {
    source: BTreeMap<String, u64>,
    target: BTreeMap<String, u64>,
}

impl SnapshotInventory {
    /// Builds an inventory from per-side listings.
    ///
    /// Duplicate names within one listing keep the last observation, which
    /// matches the behaviour of re-running the enumeration.
    #[must_use]
    pub fn from_listings(source: Vec<Snapshot>, target: Vec<Snapshot>) -> Self {
        let mut inventory = Self::default();
        for snapshot in source {
            inventory.source.insert(snapshot.name, snapshot.ctime);
        }
        for snapshot in target {
            inventory.target.insert(snapshot.name, snapshot.ctime);
        }
        inventory
    }

    /// Returns the map for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &BTreeMap<String, u64> {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Returns the oldest source snapshot.
    ///
    /// Ordering is by creation time ascending; ties on creation time are
    /// broken by lexically smallest name so the choice is deterministic.
    #[must_use]
    pub fn oldest_source(&self) -> Option<Snapshot> {
        self.source
            .iter()
            .min_by_key(|(name, ctime)| (**ctime, (*name).clone()))
            .map(|(name, ctime)| Snapshot::new(name.clone(), *ctime))
    }

    /// Returns the most recent snapshot present on both sides.
    ///
    /// A snapshot matches when its name exists on both sides with equal
    /// creation times. Among matches the greatest source creation time wins;
    /// ties are broken by lexically greatest name.
    #[must_use]
    pub fn most_recent_common(&self) -> Option<Snapshot> {
        self.source
            .iter()
            .filter(|(name, ctime)| self.target.get(*name) == Some(*ctime))
            .max_by_key(|(name, ctime)| (**ctime, (*name).clone()))
            .map(|(name, ctime)| Snapshot::new(name.clone(), *ctime))
    }

    /// Renders the inventory for `--dumpsnaps` output, one line per
    /// observation.
    #[must_use]
    pub fn render_dump(&self) -> String {
        let mut out = String::new();
        for (side, map) in [(Side::Source, &self.source), (Side::Target, &self.target)] {
            for (name, ctime) in map {
                out.push_str(&format!("{side}\t{name}\t{ctime}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Side, Snapshot, SnapshotInventory};

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
    fn oldest_source_prefers_smallest_ctime() {
        let inventory = inventory(&[("b", 200), ("a", 100)], &[]);
        assert_eq!(inventory.oldest_source(), Some(Snapshot::new("a", 100)));
    }

    #[test]
    fn oldest_source_breaks_ties_lexically() {
        let inventory = inventory(&[("beta", 100), ("alpha", 100)], &[]);
        assert_eq!(inventory.oldest_source(), Some(Snapshot::new("alpha", 100)));
    }

    #[test]
    fn common_match_requires_equal_ctime() {
        let inventory = inventory(&[("a", 10), ("b", 20)], &[("a", 10), ("b", 21)]);
        assert_eq!(inventory.most_recent_common(), Some(Snapshot::new("a", 10)));
    }

    #[test]
    fn most_recent_common_prefers_greatest_ctime_then_name() {
        let inventory = inventory(
            &[("a", 10), ("b", 30), ("c", 30)],
            &[("a", 10), ("b", 30), ("c", 30)],
        );
        assert_eq!(inventory.most_recent_common(), Some(Snapshot::new("c", 30)));
    }

    #[test]
    fn no_common_snapshot_yields_none() {
        let inventory = inventory(&[("a", 10)], &[("b", 20)]);
        assert_eq!(inventory.most_recent_common(), None);
    }

    #[test]
    fn dump_lists_both_sides() {
        let inventory = inventory(&[("a", 10)], &[("b", 20)]);
        let dump = inventory.render_dump();
        assert!(dump.contains("source\ta\t10"));
        assert!(dump.contains("target\tb\t20"));
    }

    #[test]
    fn side_accessor_returns_requested_map() {
        let inventory = inventory(&[("a", 10)], &[("b", 20)]);
        assert!(inventory.side(Side::Source).contains_key("a"));
        assert!(inventory.side(Side::Target).contains_key("b"));
    }
}
