use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// 4.3.16 End of central directory record
#[derive(Debug)]
pub struct EndOfCentralDirectoryRecord {
    /// total number of entries in the central directory
    pub directory_records: u16,

    /// size of the central directory
    pub directory_size: u32,

    /// offset of start of central directory
    pub directory_offset: u32,

    /// length of the archive comment that follows the record
    pub comment_len: u16,
}

impl EndOfCentralDirectoryRecord {
    /// The signature for the end of central directory record
    pub const SIGNATURE: &'static str = "PK\x05\x06";

    /// Length of the record, comment excluded.
    pub const SIZE: usize = 22;

    /// The forged trailer appended after the real record when local headers
    /// lie. Tools that scan backwards for the magic and trust the first hit
    /// land on an empty directory claimed to sit at 0xFFFFFFFF.
    pub fn poison() -> Self {
        Self {
            directory_records: 0,
            directory_size: 0x8000_0000,
            directory_offset: 0xFFFF_FFFF,
            comment_len: 0,
        }
    }

    /// Emit the record, single-disk fields implied.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE.as_bytes())?;
        w.write_u16::<LittleEndian>(0)?; // number of this disk
        w.write_u16::<LittleEndian>(0)?; // disk with the directory start
        w.write_u16::<LittleEndian>(self.directory_records)?; // on this disk
        w.write_u16::<LittleEndian>(self.directory_records)?; // total
        w.write_u32::<LittleEndian>(self.directory_size)?;
        w.write_u32::<LittleEndian>(self.directory_offset)?;
        w.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }
}
