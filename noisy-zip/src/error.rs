//! All error types used in this crate

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::encoding::{DecodingError, EncodingError};

/// Any error a build or a recovery can produce, from rejected configuration
/// to filesystem failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An option is out of range or otherwise unusable.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// A name could not be represented in the selected output encoding.
    #[error("encoding: {0}")]
    Encoding(#[from] EncodingError),

    /// Raw name bytes could not be converted back to text.
    #[error("decoding: {0}")]
    Decoding(#[from] DecodingError),

    /// I/O-related error
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The source directory yielded no files; an empty archive is rejected
    /// rather than written.
    #[error("nothing to archive under {}", dir.display())]
    EmptyInput {
        /// The directory that was walked
        dir: PathBuf,
    },

    /// The DEFLATE compressor could not make progress.
    #[error("deflate: {msg}")]
    Deflate {
        /// Additional information
        msg: &'static str,
    },
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e => std::io::Error::other(e),
        }
    }
}
