//! Streaming transforms a payload goes through on its way to the staged
//! temp file: crc + size counting, and optionally raw DEFLATE.

use std::io::{self, Write};

use miniz_oxide::deflate::core::{
    compress, create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide, TDEFLFlush,
    TDEFLStatus,
};

use crate::error::Error;

/// Write-through adaptor that computes a crc-32 (IEEE, reflected) and
/// counts the bytes passing through, then forwards them to an inner sink.
///
/// The counter is a deliberately wrapping u32: nothing in this container
/// format survives past 4 GiB anyway.
pub struct CountingCrcWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
    count: u32,
}

impl<W: Write> CountingCrcWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            count: 0,
        }
    }

    /// Give back the inner sink along with `(crc32, byte_count)`.
    pub fn finish(self) -> (W, u32, u32) {
        (self.inner, self.hasher.finalize(), self.count)
    }
}

impl<W: Write> Write for CountingCrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count = self.count.wrapping_add(n as u32);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Raw DEFLATE in front of an inner sink: no zlib header, no trailing
/// checksum, just RFC 1951 bits, which is what a zip payload is.
///
/// Counts the compressed bytes it pushes downstream, i.e. the eventual
/// `compressed_size` of the entry.
pub struct DeflateSink<W> {
    inner: W,
    compressor: Box<CompressorOxide>,
    scratch: Vec<u8>,
    written: u32,
}

impl<W: Write> DeflateSink<W> {
    const SCRATCH_LEN: usize = 64 * 1024;

    /// Compress at `level` (0..=9). `huffman_only` disables the match
    /// finder entirely, leaving literal bytes under Huffman codes.
    pub fn new(inner: W, level: u8, huffman_only: bool) -> Self {
        let strategy = if huffman_only {
            CompressionStrategy::HuffmanOnly
        } else {
            CompressionStrategy::Default
        };
        // negative window bits = raw deflate, no zlib wrapper
        let flags = create_comp_flags_from_zip_params(level as i32, -15, strategy as i32);
        Self {
            inner,
            compressor: Box::new(CompressorOxide::new(flags)),
            scratch: vec![0u8; Self::SCRATCH_LEN],
            written: 0,
        }
    }

    fn push(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            let (status, consumed, produced) =
                compress(&mut self.compressor, data, &mut self.scratch, TDEFLFlush::None);
            self.inner.write_all(&self.scratch[..produced])?;
            self.written = self.written.wrapping_add(produced as u32);
            data = &data[consumed..];

            match status {
                TDEFLStatus::Okay | TDEFLStatus::Done => {}
                _ => return Err(io::Error::other("deflate compression failed")),
            }
        }
        Ok(())
    }

    /// Flush the final block and give back `(inner, compressed_size)`.
    pub fn finish(mut self) -> Result<(W, u32), Error> {
        loop {
            let (status, _consumed, produced) =
                compress(&mut self.compressor, &[], &mut self.scratch, TDEFLFlush::Finish);
            self.inner.write_all(&self.scratch[..produced])?;
            self.written = self.written.wrapping_add(produced as u32);
            match status {
                TDEFLStatus::Done => return Ok((self.inner, self.written)),
                TDEFLStatus::Okay => continue,
                _ => {
                    return Err(Error::Deflate {
                        msg: "could not finish the deflate stream",
                    })
                }
            }
        }
    }
}

impl<W: Write> Write for DeflateSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniz_oxide::inflate::decompress_to_vec;

    #[test]
    fn counting_writer_reports_crc_and_size() {
        let mut w = CountingCrcWriter::new(Vec::new());
        w.write_all(b"hel").unwrap();
        w.write_all(b"lo").unwrap();
        let (inner, crc, count) = w.finish();
        assert_eq!(inner, b"hello");
        assert_eq!(crc, 0x3610_A686);
        assert_eq!(count, 5);
    }

    #[test]
    fn deflate_sink_produces_a_raw_stream() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let mut sink = DeflateSink::new(Vec::new(), 6, false);
        sink.write_all(&data).unwrap();
        let (compressed, csize) = sink.finish().unwrap();
        assert_eq!(compressed.len() as u32, csize);
        assert!(compressed.len() < data.len());
        assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
    }

    #[test]
    fn huffman_only_still_round_trips() {
        let data = b"aaaabbbbcccc".repeat(100);
        let mut sink = DeflateSink::new(Vec::new(), 6, true);
        sink.write_all(&data).unwrap();
        let (compressed, _) = sink.finish().unwrap();
        assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
    }

    #[test]
    fn level_zero_emits_stored_blocks() {
        let data = vec![7u8; 1000];
        let mut sink = DeflateSink::new(Vec::new(), 0, false);
        sink.write_all(&data).unwrap();
        let (compressed, _) = sink.finish().unwrap();
        assert!(compressed.len() >= data.len());
        assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
    }

    #[test]
    fn empty_input_still_produces_a_final_block() {
        let sink = DeflateSink::new(Vec::new(), 6, false);
        let (compressed, csize) = sink.finish().unwrap();
        assert!(!compressed.is_empty());
        assert_eq!(compressed.len() as u32, csize);
        assert_eq!(decompress_to_vec(&compressed).unwrap(), Vec::<u8>::new());
    }
}
