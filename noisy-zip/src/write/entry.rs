//! Builds one sealed entry: metadata plus a staged payload in a temp file.

use std::fs::File;
use std::io::{self, Read, Write};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;
use tracing::trace;

use crate::config::{Compression, Config, Strategy};
use crate::error::Error;
use crate::format::{Method, MsdosTimestamp, FLAG_DATA_DESCRIPTOR, FLAG_UTF8};
use crate::rng::NoiseRng;
use crate::write::sink::{CountingCrcWriter, DeflateSink};
use crate::write::{FileSpec, CHUNK, NOISE_PREFIX};

/// One archive member, sealed: every field the headers need is final, and
/// the (possibly compressed) payload sits in a temp file this entry owns.
///
/// The temp file is unlinked when the entry drops, on every path.
#[derive(Debug)]
pub struct Entry {
    /// The name as it will appear on disk, in the chosen encoding.
    pub name_bytes: Vec<u8>,

    /// General-purpose flags; only bits 3 and 11 are ever set.
    pub flags: u16,

    /// Store or deflate.
    pub method: Method,

    /// Packed MS-DOS modification timestamp.
    pub modified: MsdosTimestamp,

    /// crc-32 of the uncompressed bytes.
    pub crc32: u32,

    /// Bytes staged in the payload file.
    pub compressed_size: u32,

    /// Bytes read from the source.
    pub uncompressed_size: u32,

    /// Offset of the local header, filled in by the assembler.
    pub header_offset: u32,

    payload: NamedTempFile,
}

impl Entry {
    /// A fresh read handle on the staged payload.
    pub(crate) fn open_payload(&self) -> io::Result<File> {
        self.payload.reopen()
    }
}

/// The transform stack between source bytes and the staged payload. Always
/// crc + size counting; deflate only when configured.
enum StagedSink {
    Store(CountingCrcWriter<NamedTempFile>),
    Deflate(CountingCrcWriter<DeflateSink<NamedTempFile>>),
}

impl StagedSink {
    fn new(config: &Config) -> Result<Self, Error> {
        let staged = NamedTempFile::new()?;
        Ok(match config.compression {
            Compression::Store => StagedSink::Store(CountingCrcWriter::new(staged)),
            Compression::Deflate => {
                let huffman_only = config.strategy == Strategy::HuffmanOnly;
                StagedSink::Deflate(CountingCrcWriter::new(DeflateSink::new(
                    staged,
                    config.level,
                    huffman_only,
                )))
            }
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            StagedSink::Store(w) => w.write_all(buf),
            StagedSink::Deflate(w) => w.write_all(buf),
        }
    }

    /// Seal the payload; returns `(file, crc32, uncompressed, compressed)`.
    fn finish(self) -> Result<(NamedTempFile, u32, u32, u32), Error> {
        match self {
            StagedSink::Store(w) => {
                let (staged, crc32, count) = w.finish();
                Ok((staged, crc32, count, count))
            }
            StagedSink::Deflate(w) => {
                let (deflate, crc32, count) = w.finish();
                let (staged, compressed) = deflate.finish()?;
                Ok((staged, crc32, count, compressed))
            }
        }
    }
}

fn entry_flags(config: &Config) -> u16 {
    let mut flags = 0u16;
    if config.encoding.is_utf8() {
        flags |= FLAG_UTF8;
    }
    if config.overwrite_central_dir {
        flags |= FLAG_DATA_DESCRIPTOR;
    }
    flags
}

/// Stage one source file.
pub(crate) fn stage_file(config: &Config, spec: &FileSpec) -> Result<Entry, Error> {
    let mut src = File::open(&spec.path)?;
    let mut sink = StagedSink::new(config)?;

    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
    }
    let (payload, crc32, uncompressed_size, compressed_size) = sink.finish()?;

    let modified = if config.fixed_time {
        MsdosTimestamp::EPOCH
    } else {
        MsdosTimestamp::from_datetime(DateTime::<Local>::from(spec.mtime))
    };

    trace!(
        name = %spec.rel_name,
        crc32,
        uncompressed_size,
        compressed_size,
        "staged file"
    );
    Ok(Entry {
        name_bytes: spec.name_bytes.clone(),
        flags: entry_flags(config),
        method: config.compression.method(),
        modified,
        crc32,
        compressed_size,
        uncompressed_size,
        header_offset: 0,
        payload,
    })
}

/// Stage one synthetic noise entry. Draws the name tag first and the
/// payload second, so the RNG stream layout is stable.
pub(crate) fn stage_noise(config: &Config, index: u32, rng: &mut NoiseRng) -> Result<Entry, Error> {
    let mut tag = [0u8; 2];
    rng.fill(&mut tag);
    let name = format!(
        "{NOISE_PREFIX}{index:04}_{:02x}{:02x}.bin",
        tag[0], tag[1]
    );
    let name_bytes = config.encoding.encode(&name)?;

    let mut sink = StagedSink::new(config)?;
    let mut remaining = config.noise_size as usize;
    if remaining > 0 {
        let mut buf = vec![0u8; CHUNK.min(remaining)];
        while remaining > 0 {
            let n = remaining.min(buf.len());
            rng.fill(&mut buf[..n]);
            sink.write_all(&buf[..n])?;
            remaining -= n;
        }
    }
    let (payload, crc32, uncompressed_size, compressed_size) = sink.finish()?;

    trace!(name = %name, uncompressed_size, "staged noise entry");
    Ok(Entry {
        name_bytes,
        flags: entry_flags(config),
        method: config.compression.method(),
        // unix time zero predates the format, so this collapses regardless
        // of the fixed_time setting
        modified: MsdosTimestamp::EPOCH,
        crc32,
        compressed_size,
        uncompressed_size,
        header_offset: 0,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_entries_have_junk_names_and_sized_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(dir.path(), dir.path().join("out.zip"));
        config.compression = Compression::Store;
        config.noise_size = 48;
        config.seed = Some(7);

        let mut rng = NoiseRng::from_seed(config.seed);
        let entry = stage_noise(&config, 3, &mut rng).unwrap();
        let name = String::from_utf8(entry.name_bytes.clone()).unwrap();
        assert!(name.starts_with(".junk/0003_"));
        assert!(name.ends_with(".bin"));
        assert_eq!(entry.uncompressed_size, 48);
        assert_eq!(entry.compressed_size, 48);
        assert_eq!(entry.modified, MsdosTimestamp::EPOCH);
    }

    #[test]
    fn staged_files_report_truthful_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

        let config = {
            let mut c = Config::new(dir.path(), dir.path().join("out.zip"));
            c.compression = Compression::Store;
            c
        };
        let spec = FileSpec {
            path,
            rel_name: "hello.txt".into(),
            name_bytes: b"hello.txt".to_vec(),
            mtime,
        };
        let entry = stage_file(&config, &spec).unwrap();
        assert_eq!(entry.crc32, 0x3610_A686);
        assert_eq!(entry.uncompressed_size, 5);
        assert_eq!(entry.compressed_size, 5);

        let mut staged = Vec::new();
        entry.open_payload().unwrap().read_to_end(&mut staged).unwrap();
        assert_eq!(staged, b"hello");
    }
}
