//! Bit-exact layouts for the records that make up a ZIP file: local file
//! headers, data descriptors, central directory headers, and the
//! end-of-central-directory record.
//!
//! Each record knows how to write itself (byteorder, little-endian); the
//! ones the recovery scanner reads also carry winnow parsers. Layouts
//! follow the PKWARE appnote.

use winnow::{binary::le_u16, PResult, Partial};

mod date_time;
pub use date_time::*;

mod directory_header;
pub use directory_header::*;

mod eocd;
pub use eocd::*;

mod local;
pub use local::*;

/// Bit 3 of the general-purpose flags: crc and sizes are zero in the local
/// header and live in a trailing data descriptor instead.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Bit 11 of the general-purpose flags: the entry name is UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;

/// Version 2.0 (deflate plus directories), the oldest thing every extractor
/// understands. Stamped as both "version made by" and "version needed".
pub(crate) const VERSION: u16 = 20;

/// Compression method of an entry.
///
/// Only [Store][Method::Store] and [Deflate][Method::Deflate] are ever
/// written, and only those are recovered; anything else found while
/// scanning is carried as [Unrecognized][Method::Unrecognized] and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// No compression is applied
    Store,

    /// [DEFLATE (RFC 1951)](https://www.ietf.org/rfc/rfc1951.txt)
    Deflate,

    /// A compression method this crate does not handle.
    Unrecognized(u16),
}

impl Method {
    const STORE: u16 = 0;
    const DEFLATE: u16 = 8;

    /// Parse a method from its wire representation
    pub fn parser(i: &mut Partial<&[u8]>) -> PResult<Self> {
        le_u16(i).map(From::from)
    }
}

impl From<u16> for Method {
    fn from(u: u16) -> Self {
        match u {
            Self::STORE => Self::Store,
            Self::DEFLATE => Self::Deflate,
            u => Self::Unrecognized(u),
        }
    }
}

impl From<Method> for u16 {
    fn from(method: Method) -> Self {
        match method {
            Method::Store => Method::STORE,
            Method::Deflate => Method::DEFLATE,
            Method::Unrecognized(u) => u,
        }
    }
}
