//! Emits the on-disk archive from a list of sealed entries.
//!
//! Single-threaded, owns the output file for the whole build. When
//! `overwrite_central_dir` is set the local headers get zeroed crc/sizes up
//! front, the crc alone is patched back in after the payload, truthful
//! sizes move to a data descriptor, and a poison tail follows the real
//! EOCD. The central directory tells the truth in every mode.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Error;
use crate::format::{
    DataDescriptorRecord, DirectoryHeaderRecord, EndOfCentralDirectoryRecord,
    LocalFileHeaderRecord,
};
use crate::rng::NoiseRng;
use crate::write::entry::Entry;
use crate::write::{BuildReport, CHUNK};

pub(crate) fn assemble(
    config: &Config,
    entries: &mut [Entry],
    rng: &mut NoiseRng,
) -> Result<BuildReport, Error> {
    let lying = config.overwrite_central_dir;
    let mut out = BufWriter::new(File::create(&config.out_zip)?);
    let mut pos: u64 = 0;
    let mut copy_buf = vec![0u8; CHUNK];

    for entry in entries.iter_mut() {
        entry.header_offset = pos as u32;

        let header = LocalFileHeaderRecord {
            flags: entry.flags,
            method: entry.method,
            modified: entry.modified,
            crc32: if lying { 0 } else { entry.crc32 },
            compressed_size: if lying { 0 } else { entry.compressed_size },
            uncompressed_size: if lying { 0 } else { entry.uncompressed_size },
            name: entry.name_bytes.clone(),
            extra: vec![],
        };
        header.write_to(&mut out)?;
        pos += header.written_len() as u64;

        let mut payload = entry.open_payload()?;
        loop {
            let n = payload.read(&mut copy_buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&copy_buf[..n])?;
        }
        pos += entry.compressed_size as u64;

        if lying {
            // the crc gets patched to the truth, the sizes stay zero
            out.seek(SeekFrom::Start(
                entry.header_offset as u64 + LocalFileHeaderRecord::CRC_OFFSET,
            ))?;
            out.write_u32::<LittleEndian>(entry.crc32)?;
            out.seek(SeekFrom::Start(pos))?;

            DataDescriptorRecord {
                crc32: entry.crc32,
                compressed_size: entry.compressed_size,
                uncompressed_size: entry.uncompressed_size,
            }
            .write_to(&mut out)?;
            pos += DataDescriptorRecord::SIZE as u64;
        }

        trace!(
            offset = entry.header_offset,
            compressed_size = entry.compressed_size,
            "wrote local header and payload"
        );
    }

    let directory_offset = pos;
    for entry in entries.iter() {
        let record = DirectoryHeaderRecord {
            flags: entry.flags,
            method: entry.method,
            modified: entry.modified,
            crc32: entry.crc32,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            header_offset: entry.header_offset,
            name: entry.name_bytes.clone(),
        };
        record.write_to(&mut out)?;
        pos += record.written_len() as u64;
    }

    EndOfCentralDirectoryRecord {
        directory_records: entries.len() as u16,
        directory_size: (pos - directory_offset) as u32,
        directory_offset: directory_offset as u32,
        comment_len: config.comment_size,
    }
    .write_to(&mut out)?;
    pos += EndOfCentralDirectoryRecord::SIZE as u64;

    if config.comment_size > 0 {
        let junk = rng.bytes(config.comment_size as usize);
        out.write_all(&junk)?;
        pos += junk.len() as u64;
    }

    if lying {
        out.write_all(&rng.bytes(32))?;
        EndOfCentralDirectoryRecord::poison().write_to(&mut out)?;
        out.write_all(&rng.bytes(96))?;
        pos += 32 + EndOfCentralDirectoryRecord::SIZE as u64 + 96;
    }

    out.flush()?;
    debug!(
        entries = entries.len(),
        bytes = pos,
        out = %config.out_zip.display(),
        "archive assembled"
    );
    Ok(BuildReport {
        entries: entries.len(),
        bytes_written: pos,
    })
}
