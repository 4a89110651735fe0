//! Stream compressor selection.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::programs;

/// Stream compressors recognised for the transport pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compressor {
    /// `gzip -3` / `zcat`.
    Gzip,
    /// `lzop` / `lzop -dfc`, the default.
    Lzo,
}

impl Compressor {
    /// Returns the canonical choice name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Compressor::Gzip => "gzip",
            Compressor::Lzo => "lzo",
        }
    }

    /// Returns the compressor used when `--compress` is not given.
    #[must_use]
    pub const fn default_choice() -> Self {
        Compressor::Lzo
    }

    /// Returns the binary probed for on each location.
    #[must_use]
    pub const fn probe_binary(self) -> &'static str {
        match self {
            Compressor::Gzip => programs::GZIP,
            Compressor::Lzo => programs::LZOP,
        }
    }

    /// Returns the argv of the compressing stage.
    #[must_use]
    pub fn compress_argv(self) -> Vec<String> {
        match self {
            Compressor::Gzip => vec![programs::GZIP.to_string(), "-3".to_string()],
            Compressor::Lzo => vec![programs::LZOP.to_string()],
        }
    }

    /// Returns the argv of the decompressing stage.
    #[must_use]
    pub fn decompress_argv(self) -> Vec<String> {
        match self {
            Compressor::Gzip => vec![programs::ZCAT.to_string()],
            Compressor::Lzo => vec![
                programs::LZOP.to_string(),
                "-dfc".to_string(),
            ],
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::default_choice()
    }
}

/// Error carrying the rejected `--compress` value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownCompressor {
    input: String,
}

impl UnknownCompressor {
    /// Returns the rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for UnknownCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised compression choice {:?}", self.input)
    }
}

impl std::error::Error for UnknownCompressor {}

impl FromStr for Compressor {
    type Err = UnknownCompressor;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "gzip" => Ok(Compressor::Gzip),
            "lzo" => Ok(Compressor::Lzo),
            other => Err(UnknownCompressor {
                input: other.to_string(),
            }),
        }
    }
}

/// Interprets a `--compress` argument.
///
/// `none`, `no`, and `0` disable compression silently; unrecognised values
/// warn and disable it.
#[must_use]
pub fn parse_choice(text: &str) -> Option<Compressor> {
    match text {
        "none" | "no" | "0" => None,
        other => match other.parse::<Compressor>() {
            Ok(compressor) => Some(compressor),
            Err(unknown) => {
                warn!("{unknown}; continuing without compression");
                None
            }
        },
    }
}
