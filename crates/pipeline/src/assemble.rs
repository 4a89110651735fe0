//! Topology-driven pipeline assembly.
//!
//! The four topologies (local→local, local→remote, remote→local,
//! remote→remote) collapse into a list of hops, each an ordered list of
//! stages running at one location. Disabled capabilities remove exactly
//! their stage; the remaining stages keep their order.

use transport::Location;

use crate::compressor::Compressor;
use crate::probe::CapabilitySet;
use crate::stage::{BandwidthLimit, Stage};

/// Everything the assembler needs to build one send/receive pipeline.
#[derive(Clone, Debug)]
pub struct PipelineRequest<'a> {
    /// Where `zfs send` runs.
    pub source: &'a Location,
    /// Where `zfs receive` runs.
    pub target: &'a Location,
    /// The local machine, which hosts the intermediate hop when both
    /// endpoints are remote.
    pub local: &'a Location,
    /// Dataset being sent.
    pub source_dataset: &'a str,
    /// Dataset being received into.
    pub target_dataset: &'a str,
    /// Incremental base snapshot, when any.
    pub from_snapshot: Option<&'a str>,
    /// Snapshot the stream ends at.
    pub to_snapshot: &'a str,
    /// Whether the receiver is forced with `-F` (initial bootstrap only).
    pub force_receive: bool,
    /// Estimated stream size for the progress meter; `None` when the
    /// estimate is unavailable.
    pub estimated_bytes: Option<u64>,
    /// Compressor requested for the stream, before capability gating.
    pub compressor: Option<Compressor>,
    /// The probed helper capabilities.
    pub capabilities: &'a CapabilitySet,
    /// `--source-bwlimit` value, when given.
    pub source_bwlimit: Option<&'a str>,
    /// `--target-bwlimit` value, when given.
    pub target_bwlimit: Option<&'a str>,
}

/// An ordered run of stages at one location.
#[derive(Clone, Debug)]
pub struct Hop {
    /// Where every stage of this hop runs.
    pub location: Location,
    /// The stages, upstream first.
    pub stages: Vec<Stage>,
}

/// A fully assembled pipeline: hops in stream order.
#[derive(Clone, Debug)]
pub struct Pipeline {
    /// The hops, sender first.
    pub hops: Vec<Hop>,
}

impl Pipeline {
    /// Returns every stage in stream order, ignoring hop boundaries.
    #[must_use]
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.hops.iter().flat_map(|hop| hop.stages.iter())
    }
}

/// Assembles the pipeline for one send step.
#[must_use]
pub fn assemble(request: &PipelineRequest<'_>) -> Pipeline {
    let source_local = request.source.is_local();
    let target_local = request.target.is_local();

    let caps = request.capabilities;
    let compressor = request.compressor.filter(|_| {
        !(source_local && target_local) && caps.compression_allowed(source_local, target_local)
    });

    let send = Stage::Send {
        dataset: request.source_dataset.to_string(),
        from: request.from_snapshot.map(str::to_string),
        to: request.to_snapshot.to_string(),
    };
    let receive = Stage::Receive {
        dataset: request.target_dataset.to_string(),
        force: request.force_receive,
    };
    let pv = Stage::Pv {
        size: request.estimated_bytes,
    };

    let mut hops = Vec::new();
    match (source_local, target_local) {
        (true, true) => {
            // One hop on the local machine; the single mbuffer takes
            // whichever limit was supplied (source wins over target).
            let mut stages = vec![send];
            if caps.local_mbuffer {
                let limit = request
                    .source_bwlimit
                    .map(BandwidthLimit::sending)
                    .or_else(|| request.target_bwlimit.map(BandwidthLimit::receiving));
                stages.push(Stage::Mbuffer { limit });
            }
            if caps.local_pv {
                stages.push(pv);
            }
            stages.push(receive);
            hops.push(Hop {
                location: request.source.clone(),
                stages,
            });
        }
        (true, false) => {
            let mut sender = vec![send];
            if caps.local_pv {
                sender.push(pv);
            }
            if let Some(compressor) = compressor {
                sender.push(Stage::Compress(compressor));
            }
            if caps.source_mbuffer {
                sender.push(Stage::Mbuffer {
                    limit: request.source_bwlimit.map(BandwidthLimit::sending),
                });
            }
            hops.push(Hop {
                location: request.source.clone(),
                stages: sender,
            });

            let mut receiver = Vec::new();
            if caps.target_mbuffer {
                receiver.push(Stage::Mbuffer {
                    limit: request.target_bwlimit.map(BandwidthLimit::receiving),
                });
            }
            if let Some(compressor) = compressor {
                receiver.push(Stage::Decompress(compressor));
            }
            receiver.push(receive);
            hops.push(Hop {
                location: request.target.clone(),
                stages: receiver,
            });
        }
        (false, true) => {
            let mut sender = vec![send];
            if let Some(compressor) = compressor {
                sender.push(Stage::Compress(compressor));
            }
            if caps.source_mbuffer {
                sender.push(Stage::Mbuffer {
                    limit: request.source_bwlimit.map(BandwidthLimit::sending),
                });
            }
            hops.push(Hop {
                location: request.source.clone(),
                stages: sender,
            });

            let mut receiver = Vec::new();
            if caps.target_mbuffer {
                receiver.push(Stage::Mbuffer {
                    limit: request.target_bwlimit.map(BandwidthLimit::receiving),
                });
            }
            if let Some(compressor) = compressor {
                receiver.push(Stage::Decompress(compressor));
            }
            if caps.local_pv {
                receiver.push(pv);
            }
            receiver.push(receive);
            hops.push(Hop {
                location: request.target.clone(),
                stages: receiver,
            });
        }
        (false, false) => {
            let mut sender = vec![send];
            if let Some(compressor) = compressor {
                sender.push(Stage::Compress(compressor));
            }
            if caps.source_mbuffer {
                sender.push(Stage::Mbuffer {
                    limit: request.source_bwlimit.map(BandwidthLimit::sending),
                });
            }
            hops.push(Hop {
                location: request.source.clone(),
                stages: sender,
            });

            let mut intermediate = Vec::new();
            if let Some(compressor) = compressor {
                intermediate.push(Stage::Decompress(compressor));
            }
            if caps.local_pv {
                intermediate.push(pv);
            }
            if let Some(compressor) = compressor {
                intermediate.push(Stage::Compress(compressor));
            }
            if caps.local_mbuffer {
                intermediate.push(Stage::Mbuffer { limit: None });
            }
            if !intermediate.is_empty() {
                hops.push(Hop {
                    location: request.local.clone(),
                    stages: intermediate,
                });
            }

            let mut receiver = Vec::new();
            if caps.target_mbuffer {
                receiver.push(Stage::Mbuffer {
                    limit: request.target_bwlimit.map(BandwidthLimit::receiving),
                });
            }
            if let Some(compressor) = compressor {
                receiver.push(Stage::Decompress(compressor));
            }
            receiver.push(receive);
            hops.push(Hop {
                location: request.target.clone(),
                stages: receiver,
            });
        }
    }

    Pipeline { hops }
}
