#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `pipeline` builds and runs the transport pipeline that carries a ZFS
//! send stream from source to target. The pipeline is modelled as a typed
//! list of stages partitioned across up to three hops (source host, local
//! machine, target host); lowering turns each hop into concrete process
//! invocations wired together with OS pipes.
//!
//! # Design
//!
//! - [`compressor`] is the table of supported stream compressors.
//! - [`probe`] records which optional helpers exist at each location.
//! - [`stage`] is the tagged stage variant with its argv rendering.
//! - [`assemble`] applies the topology tables to produce hops.
//! - [`exec`] lowers hops to processes and supervises the process group.
//!
//! # Invariants
//!
//! - Disabling a capability removes exactly its stage; the remaining
//!   stages keep their relative order and no hop ever contains two
//!   adjacent stages of the same kind.
//! - Remote hops always ride the shared SSH control socket.

pub mod assemble;
pub mod compressor;
pub mod exec;
pub mod probe;
pub mod stage;

pub use assemble::{assemble, Hop, Pipeline, PipelineRequest};
pub use compressor::Compressor;
pub use exec::{execute, PipelineError};
pub use probe::CapabilitySet;
pub use stage::{BandwidthLimit, Stage, StageKind};

/// Absolute paths of the optional helper binaries, matching where the
/// upstream tool expects them.
pub mod programs {
    /// Progress meter.
    pub const PV: &str = "/usr/bin/pv";
    /// Byte-rate buffer and throttle.
    pub const MBUFFER: &str = "/usr/bin/mbuffer";
    /// LZO stream compressor (both directions).
    pub const LZOP: &str = "/usr/bin/lzop";
    /// Gzip stream compressor.
    pub const GZIP: &str = "/bin/gzip";
    /// Gzip stream decompressor.
    pub const ZCAT: &str = "/bin/zcat";
}
