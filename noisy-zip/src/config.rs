//! Build configuration.

use std::path::PathBuf;

use tracing::warn;

use crate::encoding::NameEncoding;
use crate::format::Method;

/// Compression applied to every entry in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw DEFLATE streams (method 8).
    #[default]
    Deflate,

    /// No compression (method 0).
    Store,
}

impl Compression {
    pub(crate) fn method(self) -> Method {
        match self {
            Compression::Deflate => Method::Deflate,
            Compression::Store => Method::Store,
        }
    }
}

/// zlib-style compression strategy.
///
/// Only [Default][Strategy::Default] and [HuffmanOnly][Strategy::HuffmanOnly]
/// change the output; the others are accepted for config compatibility and
/// ignored with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Strategy {
    #[default]
    Default,
    Filtered,
    HuffmanOnly,
    Rle,
    Fixed,
}

/// Immutable input to one build.
///
/// [Config::new] fills usable defaults; callers flip the knobs they care
/// about and hand the value to [build][crate::build], which checks every
/// range up front via [Config::validate].
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory tree to archive.
    pub src_dir: PathBuf,

    /// Where the archive is written.
    pub out_zip: PathBuf,

    /// Compression method for every entry.
    pub compression: Compression,

    /// Encoding for entry names.
    pub encoding: NameEncoding,

    /// Lie in the local headers: zero sizes, set bit 3, patch only the CRC,
    /// emit data descriptors, and append the poison tail after the EOCD.
    /// The central directory stays truthful either way.
    pub overwrite_central_dir: bool,

    /// Length of the archive comment; the comment bytes are drawn from the
    /// noise RNG. The u16 is the on-disk field, so the range is built in.
    pub comment_size: u16,

    /// Collapse every timestamp to 1980-01-01 00:00:00.
    pub fixed_time: bool,

    /// Number of synthetic `.junk/` entries appended after the real ones.
    pub noise_files: u32,

    /// Payload size of each synthetic entry, in bytes.
    pub noise_size: u32,

    /// DEFLATE level, 0..=9.
    pub level: u8,

    /// Compression strategy, see [Strategy].
    pub strategy: Strategy,

    /// Size of the compression worker pool, at least 1.
    pub workers: usize,

    /// Seed for the noise RNG. Seeded builds are bit-reproducible; without
    /// a seed, noise comes from the operating system's RNG.
    pub seed: Option<i64>,

    /// Archive hidden files too.
    pub include_hidden: bool,
}

impl Config {
    /// A default configuration: deflate level 6, UTF-8 names, truthful
    /// headers, no noise, one worker per CPU.
    pub fn new(src_dir: impl Into<PathBuf>, out_zip: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            out_zip: out_zip.into(),
            compression: Compression::default(),
            encoding: NameEncoding::default(),
            overwrite_central_dir: false,
            comment_size: 0,
            fixed_time: false,
            noise_files: 0,
            noise_size: 0,
            level: 6,
            strategy: Strategy::default(),
            workers: num_cpus::get().max(1),
            seed: None,
            include_hidden: false,
        }
    }

    /// Check every range up front so a build fails before any I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level > 9 {
            return Err(ConfigError::LevelOutOfRange(self.level));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if matches!(
            self.strategy,
            Strategy::Filtered | Strategy::Rle | Strategy::Fixed
        ) {
            warn!(
                strategy = ?self.strategy,
                "strategy has no effect, compressing with the default strategy"
            );
        }
        Ok(())
    }
}

/// An option is out of range.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// DEFLATE levels go from 0 (stored blocks) to 9.
    #[error("compression level {0} is out of range, expected 0..=9")]
    LevelOutOfRange(u8),

    /// A pool of zero workers would never finish.
    #[error("worker count must be at least 1")]
    NoWorkers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_options_are_rejected() {
        let mut config = Config::new("src", "out.zip");
        config.level = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LevelOutOfRange(10))
        ));

        let mut config = Config::new("src", "out.zip");
        config.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn ignored_strategies_still_validate() {
        let mut config = Config::new("src", "out.zip");
        config.strategy = Strategy::Rle;
        assert!(config.validate().is_ok());
    }
}
