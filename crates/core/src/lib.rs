#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `syncoid_core` houses the replication primitives shared across the
//! oc-syncoid workspace: the endpoint model parsed from
//! `[user@host:]dataset` operands, the snapshot inventory built from both
//! sides of a transfer, the planner that turns an inventory into a concrete
//! replication plan, and the sync-snapshot naming discipline that keeps the
//! incremental baseline advancing run after run.
//!
//! # Design
//!
//! The crate performs no process spawning and no I/O beyond the platform
//! queries it needs (effective uid, hostname, signal flags). Everything else
//! is a pure function over owned data so the planner and prune selection can
//! be exercised exhaustively in unit tests:
//!
//! - [`endpoint`] parses and reconstructs replication operands.
//! - [`snapshot`] models per-side snapshot listings and the merged inventory.
//! - [`plan`] selects between bootstrap and incremental replication.
//! - [`sync_name`] mints and recognises host-scoped sync snapshots.
//! - [`exit_code`] centralises the process exit statuses.
//!
//! # Invariants
//!
//! - Plan selection never mutates the inventory it inspects.
//! - Sync snapshot names produced by [`sync_name::SyncName`] always satisfy
//!   [`sync_name::is_prunable_name`] for the minting hostname.

pub mod endpoint;
pub mod exit_code;
pub mod plan;
pub mod signal;
pub mod snapshot;
pub mod sync_name;
pub mod version;

pub use endpoint::{Endpoint, EndpointParseError, RemoteUser};
pub use exit_code::ExitCode;
pub use plan::{Plan, PlanError, SendStep};
pub use snapshot::{Side, Snapshot, SnapshotInventory};
pub use sync_name::SyncName;
