//! Raw DEFLATE decoding for payloads of unknown length.
//!
//! Recovered size fields cannot be trusted, so the decoder gets handed
//! everything from the data offset to the end of the buffer and stops by
//! itself: a DEFLATE stream marks its final block, and miniz_oxide reports
//! how many input bytes it actually consumed. Trailing bytes (the next
//! entry, the central directory, garbage) are simply never read.

use miniz_oxide::inflate::{
    core::{decompress, inflate_flags::TINFL_FLAG_IGNORE_ADLER32, DecompressorOxide},
    TINFLStatus,
};
use tracing::trace;

// miniz_oxide wants a power-of-two circular window of at least 32 KiB
const WINDOW_LEN: usize = 64 * 1024;

/// Inflate a raw DEFLATE stream that starts at `input[0]` and ends wherever
/// its final block says it does. Returns the decompressed bytes and the
/// number of input bytes consumed, or `None` for anything that is not a
/// complete stream.
pub(crate) fn inflate_raw(input: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut state = Box::new(DecompressorOxide::new());
    let mut window = vec![0u8; WINDOW_LEN];
    let mut result = Vec::new();
    let mut in_pos = 0;
    let mut out_pos = 0;

    loop {
        let (status, consumed, produced) = decompress(
            &mut state,
            &input[in_pos..],
            &mut window,
            out_pos,
            TINFL_FLAG_IGNORE_ADLER32,
        );
        in_pos += consumed;
        result.extend_from_slice(&window[out_pos..out_pos + produced]);
        out_pos += produced;
        if out_pos == WINDOW_LEN {
            out_pos = 0;
        }

        match status {
            TINFLStatus::Done => {
                trace!(consumed = in_pos, produced = result.len(), "stream complete");
                return Some((result, in_pos));
            }
            TINFLStatus::HasMoreOutput => continue,
            status => {
                trace!(?status, consumed = in_pos, "not a usable deflate stream");
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniz_oxide::deflate::compress_to_vec;

    #[test]
    fn trailing_bytes_are_left_alone() {
        let data = b"incremental bracket what?".repeat(20);
        let compressed = compress_to_vec(&data, 6);
        let mut with_tail = compressed.clone();
        with_tail.extend_from_slice(b"PK\x01\x02 and then some garbage");

        let (inflated, consumed) = inflate_raw(&with_tail).unwrap();
        assert_eq!(inflated, data);
        assert_eq!(consumed, compressed.len());
    }

    #[test]
    fn truncated_streams_are_rejected() {
        let data = b"some payload that compresses".repeat(30);
        let compressed = compress_to_vec(&data, 6);
        assert!(inflate_raw(&compressed[..compressed.len() / 2]).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        // 0x07 opens a final block with the reserved block type
        assert!(inflate_raw(&[0x07; 16]).is_none());
        assert!(inflate_raw(&[]).is_none());
    }

    #[test]
    fn output_larger_than_the_window_round_trips() {
        let data: Vec<u8> = (0u32..100_000).map(|i| (i * 31 % 251) as u8).collect();
        let compressed = compress_to_vec(&data, 9);
        let (inflated, consumed) = inflate_raw(&compressed).unwrap();
        assert_eq!(inflated, data);
        assert_eq!(consumed, compressed.len());
    }
}
