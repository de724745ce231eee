//! Heuristic recovery of file trees from damaged archives.
//!
//! Nothing here reads the central directory. The whole input is scanned
//! for local file header signatures; each candidate is parsed, its name
//! decoded across the historical code pages, and its payload delimited
//! without trusting any recorded size: DEFLATE streams end themselves, and
//! stored payloads are either sized by a header nobody zeroed or matched
//! against a checksum-validated data descriptor.
//!
//! Recovery never aborts because one entry is broken; it logs, skips, and
//! moves on. Only I/O trouble in the output directory is fatal.

use std::fs;
use std::path::Path;

use tracing::{debug, trace};
use winnow::Partial;

use crate::config::Config;
use crate::encoding::decode_name;
use crate::error::Error;
use crate::format::{DataDescriptorRecord, LocalFileHeaderRecord, Method};
use crate::host::Host;
use crate::write::{build, BuildReport, NOISE_PREFIX};

mod inflate;

/// What a recovery pass found.
#[derive(Debug)]
pub struct RecoverReport {
    /// Local-header signatures seen in the input.
    pub candidates: usize,

    /// Names of the files written out, in scan order.
    pub recovered: Vec<String>,

    /// Candidates that did not turn into a file (noise, broken headers,
    /// undecodable payloads).
    pub skipped: usize,
}

/// Scan `archive` and write every recoverable file under `out_dir`.
pub fn recover(archive: &Path, out_dir: &Path, host: &Host) -> Result<RecoverReport, Error> {
    // the scanner works on the whole archive in memory, by design
    let buffer = fs::read(archive)?;
    debug!(bytes = buffer.len(), archive = %archive.display(), "scanning");
    recover_buffer(&buffer, out_dir, host)
}

/// [recover()], minus the file read.
pub fn recover_buffer(buffer: &[u8], out_dir: &Path, host: &Host) -> Result<RecoverReport, Error> {
    let candidates = find_local_headers(buffer);
    let total = candidates.len() as u64;
    let mut report = RecoverReport {
        candidates: candidates.len(),
        recovered: Vec::new(),
        skipped: 0,
    };

    for (index, &start) in candidates.iter().enumerate() {
        let done = index as u64 + 1;
        match scan_candidate(buffer, start, host) {
            Scanned::Recovered { name, data } => {
                let path = out_dir.join(&name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, &data)?;
                debug!(offset = start, name = %name, bytes = data.len(), "recovered");
                host.progress(done, total, &name);
                report.recovered.push(name);
            }
            Scanned::Skipped { name } => {
                report.skipped += 1;
                host.progress(done, total, name.as_deref().unwrap_or(""));
            }
        }
    }

    debug!(
        candidates = report.candidates,
        recovered = report.recovered.len(),
        skipped = report.skipped,
        "scan finished"
    );
    Ok(report)
}

/// Recover `archive` into a temp directory, then rebuild it as a clean
/// archive at `out_zip`: no noise, no lying headers, UTF-8 names.
pub fn recover_to_zip(archive: &Path, out_zip: &Path, host: &Host) -> Result<BuildReport, Error> {
    let staging = tempfile::tempdir()?;
    recover(archive, staging.path(), host)?;

    let mut config = Config::new(staging.path(), out_zip);
    // recovered names may legitimately start with a dot
    config.include_hidden = true;
    build(&config, host)
}

fn find_local_headers(buffer: &[u8]) -> Vec<usize> {
    let signature = LocalFileHeaderRecord::SIGNATURE.as_bytes();
    buffer
        .windows(signature.len())
        .enumerate()
        .filter_map(|(offset, window)| (window == signature).then_some(offset))
        .collect()
}

enum Scanned {
    Recovered { name: String, data: Vec<u8> },
    Skipped { name: Option<String> },
}

fn skip(name: Option<String>) -> Scanned {
    Scanned::Skipped { name }
}

/// Try to turn the candidate at `start` into a `(name, bytes)` pair.
fn scan_candidate(buffer: &[u8], start: usize, host: &Host) -> Scanned {
    let mut input = Partial::new(&buffer[start..]);
    let header = match LocalFileHeaderRecord::parser(&mut input) {
        Ok(header) => header,
        Err(_) => {
            trace!(offset = start, "signature without a parseable header");
            return skip(None);
        }
    };

    let name = match decode_name(&header.name, header.flags) {
        Ok(name) => name,
        Err(e) => {
            debug!(offset = start, "undecodable name: {e}");
            host.log(&format!("skipping entry at {start}: {e}"));
            return skip(None);
        }
    };
    let Some(safe) = sanitize_name(&name) else {
        debug!(offset = start, name = %name, "name sanitizes to nothing");
        return skip(Some(name));
    };
    if safe.starts_with(NOISE_PREFIX) {
        trace!(offset = start, name = %safe, "dropping noise entry");
        return skip(Some(safe));
    }

    let data_offset = start + LocalFileHeaderRecord::SIZE + header.name.len() + header.extra.len();
    if data_offset > buffer.len() {
        return skip(Some(safe));
    }
    let tail = &buffer[data_offset..];

    let data = match (header.method, header.has_data_descriptor()) {
        (Method::Store, false) => {
            // the one case where the recorded size is worth anything
            let size = header.compressed_size as usize;
            if size > tail.len() {
                debug!(offset = start, name = %safe, "stored payload is truncated");
                host.log(&format!("skipping {safe}: truncated payload"));
                return skip(Some(safe));
            }
            tail[..size].to_vec()
        }
        (Method::Store, true) => match delimit_stored(tail) {
            Some(data) => data,
            None => {
                debug!(offset = start, name = %safe, "no descriptor matches the stored payload");
                host.log(&format!("skipping {safe}: could not delimit stored payload"));
                return skip(Some(safe));
            }
        },
        (Method::Deflate, _) => match inflate::inflate_raw(tail) {
            Some((data, _consumed)) => data,
            None => {
                debug!(offset = start, name = %safe, "payload does not inflate");
                host.log(&format!("skipping {safe}: payload does not inflate"));
                return skip(Some(safe));
            }
        },
        (method, _) => {
            debug!(offset = start, name = %safe, ?method, "method not supported");
            host.log(&format!("skipping {safe}: unsupported method"));
            return skip(Some(safe));
        }
    };

    Scanned::Recovered { name: safe, data }
}

/// A stored payload whose local header lies carries its true size only in
/// the trailing data descriptor. Scan forward for a descriptor whose size
/// fields equal the distance back to the data start and whose crc matches
/// the spanned bytes; a descriptor faked inside the payload would have to
/// get both right at once.
fn delimit_stored(tail: &[u8]) -> Option<Vec<u8>> {
    let signature = DataDescriptorRecord::SIGNATURE.as_bytes();
    for (gap, window) in tail.windows(signature.len()).enumerate() {
        if window != signature {
            continue;
        }
        let mut input = Partial::new(&tail[gap..]);
        let Ok(descriptor) = DataDescriptorRecord::parser(&mut input) else {
            continue;
        };
        if descriptor.compressed_size as usize != gap
            || descriptor.uncompressed_size as usize != gap
        {
            continue;
        }
        if crc32fast::hash(&tail[..gap]) != descriptor.crc32 {
            trace!(gap, "descriptor sizes match but crc does not");
            continue;
        }
        return Some(tail[..gap].to_vec());
    }
    None
}

/// Reduce a decoded name to a safe relative path: forward slashes only, no
/// leading slash, no `.`/`..` segments. `None` when nothing is left.
fn sanitize_name(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let parts: Vec<&str> = normalized
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_the_usual_tricks() {
        assert_eq!(sanitize_name("a/b.txt").as_deref(), Some("a/b.txt"));
        assert_eq!(sanitize_name("./a//b.txt").as_deref(), Some("a/b.txt"));
        assert_eq!(sanitize_name("/etc/passwd").as_deref(), Some("etc/passwd"));
        assert_eq!(
            sanitize_name("..\\..\\evil.exe").as_deref(),
            Some("evil.exe")
        );
        assert_eq!(
            sanitize_name("../../../tmp/x").as_deref(),
            Some("tmp/x")
        );
        assert_eq!(sanitize_name(""), None);
        assert_eq!(sanitize_name("/"), None);
        assert_eq!(sanitize_name("./.."), None);
    }

    #[test]
    fn descriptor_delimiting_checks_sizes_and_crc() {
        let payload = b"stored payload bytes";
        let mut tail = payload.to_vec();
        let descriptor = DataDescriptorRecord {
            crc32: crc32fast::hash(payload),
            compressed_size: payload.len() as u32,
            uncompressed_size: payload.len() as u32,
        };
        descriptor.write_to(&mut tail).unwrap();
        tail.extend_from_slice(b"and the next entry");

        assert_eq!(delimit_stored(&tail).as_deref(), Some(&payload[..]));
    }

    #[test]
    fn descriptor_with_wrong_crc_is_ignored() {
        let payload = b"stored payload bytes";
        let mut tail = payload.to_vec();
        let descriptor = DataDescriptorRecord {
            crc32: 0x1234_5678,
            compressed_size: payload.len() as u32,
            uncompressed_size: payload.len() as u32,
        };
        descriptor.write_to(&mut tail).unwrap();

        assert!(delimit_stored(&tail).is_none());
    }
}
