use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::format::{Method, MsdosTimestamp, VERSION};

/// 4.3.12 Central directory header
///
/// Write-only in this crate: the recovery scanner never trusts a central
/// directory, and the one we emit always tells the truth, even when the
/// local headers do not.
#[derive(Debug)]
pub struct DirectoryHeaderRecord {
    /// general purpose bit flag
    pub flags: u16,

    /// compression method
    pub method: Method,

    /// last mod file datetime
    pub modified: MsdosTimestamp,

    /// crc-32
    pub crc32: u32,

    /// compressed size
    pub compressed_size: u32,

    /// uncompressed size
    pub uncompressed_size: u32,

    /// offset of the local file header from the start of the archive
    pub header_offset: u32,

    /// file name, raw bytes
    pub name: Vec<u8>,
}

impl DirectoryHeaderRecord {
    /// The signature for a central directory header
    pub const SIGNATURE: &'static str = "PK\x01\x02";

    /// Fixed-size part of the record, before the name.
    pub const SIZE: usize = 46;

    /// Emit the record. Comment, disk and attribute fields are always zero;
    /// no extra field is written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE.as_bytes())?;
        w.write_u16::<LittleEndian>(VERSION)?; // version made by
        w.write_u16::<LittleEndian>(VERSION)?; // version needed to extract
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method.into())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // extra field length
        w.write_u16::<LittleEndian>(0)?; // comment length
        w.write_u16::<LittleEndian>(0)?; // disk number start
        w.write_u16::<LittleEndian>(0)?; // internal attributes
        w.write_u32::<LittleEndian>(0)?; // external attributes
        w.write_u32::<LittleEndian>(self.header_offset)?;
        w.write_all(&self.name)
    }

    /// Bytes [write_to][Self::write_to] emits.
    pub fn written_len(&self) -> usize {
        Self::SIZE + self.name.len()
    }
}
