//! Sync snapshot naming and prune eligibility.
//!
//! Every run mints one snapshot named `syncoid_<hostname>_<stamp>` on the
//! source before sending. The hostname scoping keeps multiple replication
//! hosts (and upstream syncoid peers) from pruning each other's sync
//! points.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Leading component of every sync snapshot name.
pub const SYNC_SNAPSHOT_TOOL: &str = "syncoid";

/// Stamp format appended to the minted name, rendered in local time.
const SYNC_STAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month padding:zero]-[day padding:zero]:[hour padding:zero]:[minute padding:zero]:[second padding:zero]"
);

/// A sync snapshot name minted for the current run.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SyncName {
    name: String,
}

impl SyncName {
    /// Mints a sync snapshot name for `hostname` stamped with the current
    /// local time (falling back to UTC when the local offset cannot be
    /// determined).
    #[must_use]
    pub fn mint(hostname: &str) -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::mint_at(hostname, now)
    }

    /// Mints a sync snapshot name for `hostname` stamped with `moment`.
    #[must_use]
    pub fn mint_at(hostname: &str, moment: OffsetDateTime) -> Self {
        let stamp = moment
            .format(SYNC_STAMP_FORMAT)
            .expect("static timestamp format renders");
        Self {
            name: format!("{}{stamp}", prune_prefix(hostname)),
        }
    }

    /// Returns the snapshot name (the part after `@`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

/// Returns the name prefix owned by `hostname`'s sync snapshots.
#[must_use]
pub fn prune_prefix(hostname: &str) -> String {
    format!("{SYNC_SNAPSHOT_TOOL}_{hostname}_")
}

/// Reports whether `name` is eligible for pruning by this run.
///
/// Eligible names carry the sync prefix for the *current* hostname and are
/// not the snapshot minted by the run itself.
#[must_use]
pub fn is_prunable_name(name: &str, hostname: &str, keep: &str) -> bool {
    name != keep && name.starts_with(&prune_prefix(hostname))
}

/// Returns the local machine's hostname.
#[must_use]
pub fn local_hostname() -> String {
    rustix::system::uname()
        .nodename()
        .to_string_lossy()
        .into_owned()
}
