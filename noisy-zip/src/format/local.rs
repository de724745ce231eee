use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use winnow::{
    binary::{le_u16, le_u32},
    seq,
    token::{literal, take},
    PResult, Parser, Partial,
};

use crate::format::{Method, MsdosTimestamp, FLAG_DATA_DESCRIPTOR, VERSION};

/// 4.3.7 Local file header
#[derive(Debug)]
pub struct LocalFileHeaderRecord {
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

    /// file name, raw bytes in whatever encoding the flags imply
    pub name: Vec<u8>,

    /// extra field, kept only for its length (we never write one)
    pub extra: Vec<u8>,
}

impl LocalFileHeaderRecord {
    /// The signature for a local file header
    pub const SIGNATURE: &'static str = "PK\x03\x04";

    /// Fixed-size part of the record, before the name and extra field.
    pub const SIZE: usize = 30;

    /// Byte offset of the crc-32 field, for patching after the payload is
    /// written.
    pub const CRC_OFFSET: u64 = 14;

    /// Parser for the local file header
    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = literal(Self::SIGNATURE).parse_next(i)?;
        let _reader_version = le_u16.parse_next(i)?;
        let flags = le_u16.parse_next(i)?;
        let method = le_u16.parse_next(i).map(Method::from)?;
        let modified = MsdosTimestamp::parser.parse_next(i)?;
        let crc32 = le_u32.parse_next(i)?;
        let compressed_size = le_u32.parse_next(i)?;
        let uncompressed_size = le_u32.parse_next(i)?;
        let name_len = le_u16.parse_next(i)?;
        let extra_len = le_u16.parse_next(i)?;
        let name = take(name_len).parse_next(i)?.to_vec();
        let extra = take(extra_len).parse_next(i)?.to_vec();

        Ok(Self {
            flags,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
        })
    }

    /// Check for the presence of the bit flag that indicates a data
    /// descriptor after the file data.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Emit the record. The name follows the fixed part; we never write an
    /// extra field.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE.as_bytes())?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method.into())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_all(&self.name)
    }

    /// Bytes [write_to][Self::write_to] emits.
    pub fn written_len(&self) -> usize {
        Self::SIZE + self.name.len()
    }
}

/// 4.3.9 Data descriptor, always written with its signature (which the
/// appnote treats as optional).
#[derive(Debug)]
pub struct DataDescriptorRecord {
    /// CRC32 checksum
    pub crc32: u32,

    /// Compressed size
    pub compressed_size: u32,

    /// Uncompressed size
    pub uncompressed_size: u32,
}

impl DataDescriptorRecord {
    /// The signature for a data descriptor
    pub const SIGNATURE: &'static str = "PK\x07\x08";

    /// Full length of the record as this crate writes it.
    pub const SIZE: usize = 16;

    /// Parser for data descriptors that carry the signature.
    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = literal(Self::SIGNATURE).parse_next(i)?;
        seq! {Self {
            crc32: le_u32,
            compressed_size: le_u32,
            uncompressed_size: le_u32,
        }}
        .parse_next(i)
    }

    /// Emit the record.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE.as_bytes())?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        Ok(())
    }
}
