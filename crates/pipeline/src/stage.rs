//! The tagged pipeline stage variant and its argv rendering.

use crate::compressor::Compressor;
use crate::programs;

/// Classifies stages for ordering checks and diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StageKind {
    /// `zfs send`.
    Send,
    /// Stream compressor.
    Compress,
    /// Stream decompressor.
    Decompress,
    /// `mbuffer` buffering, optionally rate limited.
    Mbuffer,
    /// `pv` progress meter.
    Pv,
    /// `zfs receive`.
    Receive,
}

/// A byte-rate cap attached to one `mbuffer` stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BandwidthLimit {
    /// The mbuffer flag: `-R` on the sending side, `-r` on the receiving
    /// side.
    pub flag: &'static str,
    /// The rate value passed through verbatim (for example `10M`).
    pub value: String,
}

impl BandwidthLimit {
    /// A cap on the sending side (`-R`).
    #[must_use]
    pub fn sending(value: impl Into<String>) -> Self {
        Self {
            flag: "-R",
            value: value.into(),
        }
    }

    /// A cap on the receiving side (`-r`).
    #[must_use]
    pub fn receiving(value: impl Into<String>) -> Self {
        Self {
            flag: "-r",
            value: value.into(),
        }
    }
}

/// One stage of the transport pipeline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    /// The `zfs send` producing the stream.
    Send {
        /// Dataset being sent.
        dataset: String,
        /// Incremental base snapshot, when any.
        from: Option<String>,
        /// Snapshot the stream ends at.
        to: String,
    },
    /// Compress the stream.
    Compress(Compressor),
    /// Decompress the stream.
    Decompress(Compressor),
    /// Buffer (and optionally throttle) the stream.
    Mbuffer {
        /// Rate cap for this side, when any.
        limit: Option<BandwidthLimit>,
    },
    /// Meter the stream.
    Pv {
        /// Estimated stream size; `None` renders an `UNKNOWN`-total meter.
        size: Option<u64>,
    },
    /// The `zfs receive` consuming the stream.
    Receive {
        /// Dataset being received into.
        dataset: String,
        /// Whether `-F` forces the receive (initial bootstrap only).
        force: bool,
    },
}

impl Stage {
    /// Returns this stage's kind.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Send { .. } => StageKind::Send,
            Stage::Compress(_) => StageKind::Compress,
            Stage::Decompress(_) => StageKind::Decompress,
            Stage::Mbuffer { .. } => StageKind::Mbuffer,
            Stage::Pv { .. } => StageKind::Pv,
            Stage::Receive { .. } => StageKind::Receive,
        }
    }

    /// Reports whether the stage drives the ZFS control plane and thus
    /// needs root.
    #[must_use]
    pub fn needs_root(&self) -> bool {
        matches!(self, Stage::Send { .. } | Stage::Receive { .. })
    }

    /// Renders the stage's argv.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        match self {
            Stage::Send { dataset, from, to } => {
                let mut argv = vec!["zfs".to_string(), "send".to_string()];
                if let Some(from) = from {
                    argv.push("-I".to_string());
                    argv.push(format!("{dataset}@{from}"));
                }
                argv.push(format!("{dataset}@{to}"));
                argv
            }
            Stage::Compress(compressor) => compressor.compress_argv(),
            Stage::Decompress(compressor) => compressor.decompress_argv(),
            Stage::Mbuffer { limit } => {
                let mut argv = vec![programs::MBUFFER.to_string()];
                if let Some(limit) = limit {
                    argv.push(limit.flag.to_string());
                    argv.push(limit.value.clone());
                }
                argv.extend(
                    ["-q", "-s", "128k", "-m", "16M"]
                        .into_iter()
                        .map(str::to_string),
                );
                argv
            }
            Stage::Pv { size } => {
                let mut argv = vec![programs::PV.to_string()];
                if let Some(size) = size {
                    argv.push("-s".to_string());
                    argv.push(size.to_string());
                }
                argv
            }
            Stage::Receive { dataset, force } => {
                let mut argv = vec!["zfs".to_string(), "receive".to_string()];
                if *force {
                    argv.push("-F".to_string());
                }
                argv.push(dataset.clone());
                argv
            }
        }
    }
}
