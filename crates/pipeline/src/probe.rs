//! Capability probing for the optional pipeline helpers.
//!
//! Each cell records whether one helper binary exists at one location,
//! established by running `ls <absolute path>` there. A missing helper is
//! never fatal; the assembler simply omits its stage.

use tracing::warn;
use transport::{CommandSpec, Location};

use crate::compressor::Compressor;
use crate::programs;

/// Which optional helpers exist where.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CapabilitySet {
    /// Compressor binary on the source host.
    pub source_compress: bool,
    /// Compressor binary on the target host.
    pub target_compress: bool,
    /// Compressor binary on the local machine.
    pub local_compress: bool,
    /// `mbuffer` on the source host.
    pub source_mbuffer: bool,
    /// `mbuffer` on the target host.
    pub target_mbuffer: bool,
    /// `mbuffer` on the local machine.
    pub local_mbuffer: bool,
    /// `pv` on the local machine.
    pub local_pv: bool,
}

impl CapabilitySet {
    /// Returns a set with every helper assumed present, for
    /// `--nocommandchecks`.
    #[must_use]
    pub const fn assume_all() -> Self {
        Self {
            source_compress: true,
            target_compress: true,
            local_compress: true,
            source_mbuffer: true,
            target_mbuffer: true,
            local_mbuffer: true,
            local_pv: true,
        }
    }

    /// Probes the helpers on the source, target, and local machine.
    ///
    /// Probe failures (unreachable host, `ls` missing) count as absent and
    /// are logged; they never abort the run.
    #[must_use]
    pub fn probe(
        source: &Location,
        target: &Location,
        local: &Location,
        compressor: Option<Compressor>,
    ) -> Self {
        let compress_binary = compressor.map(Compressor::probe_binary);
        let probe_compress = |location: &Location, where_: &str| {
            compress_binary.is_some_and(|binary| {
                let present = binary_exists(location, binary);
                if !present {
                    warn!("{binary} unavailable on {where_}; compression may be disabled");
                }
                present
            })
        };
        let probe_mbuffer = |location: &Location, where_: &str| {
            let present = binary_exists(location, programs::MBUFFER);
            if !present {
                warn!("{} unavailable on {where_}; proceeding without buffering there", programs::MBUFFER);
            }
            present
        };

        let local_pv = binary_exists(local, programs::PV);
        if !local_pv {
            warn!("{} unavailable locally; progress metering disabled", programs::PV);
        }

        Self {
            source_compress: probe_compress(source, "source"),
            target_compress: probe_compress(target, "target"),
            local_compress: probe_compress(local, "local machine"),
            source_mbuffer: probe_mbuffer(source, "source"),
            target_mbuffer: probe_mbuffer(target, "target"),
            local_mbuffer: probe_mbuffer(local, "local machine"),
            local_pv,
        }
    }

    /// Reports whether compression may be enabled for the given topology.
    ///
    /// The compressor must exist at every location that compresses or
    /// decompresses: source and target always, plus the local machine when
    /// both endpoints are remote.
    #[must_use]
    pub fn compression_allowed(&self, source_local: bool, target_local: bool) -> bool {
        let both_remote = !source_local && !target_local;
        self.source_compress && self.target_compress && (!both_remote || self.local_compress)
    }
}

fn binary_exists(location: &Location, path: &str) -> bool {
    match CommandSpec::new(location.clone(), ["ls", path], false).run_capture() {
        Ok(output) => output.success(),
        Err(error) => {
            warn!("capability probe for {path} failed: {error}");
            false
        }
    }
}
