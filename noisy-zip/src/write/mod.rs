//! Building archives: the source walk, the parallel compression pool, and
//! the assembly pass.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::host::Host;
use crate::rng::NoiseRng;

mod assembler;
pub(crate) mod entry;
pub(crate) mod sink;

pub use entry::Entry;

/// Streaming I/O happens in chunks of this size.
pub(crate) const CHUNK: usize = 1024 * 1024;

/// Synthetic entries live under this directory, which is how the recovery
/// side recognizes and drops them.
pub(crate) const NOISE_PREFIX: &str = ".junk/";

/// What a finished build looked like.
#[derive(Debug)]
pub struct BuildReport {
    /// Total members written, noise included.
    pub entries: usize,

    /// Size of the archive in bytes.
    pub bytes_written: u64,
}

/// One file picked up by the source walk.
pub(crate) struct FileSpec {
    pub(crate) path: PathBuf,
    pub(crate) rel_name: String,
    pub(crate) name_bytes: Vec<u8>,
    pub(crate) mtime: SystemTime,
}

/// Build an archive from `config.src_dir` into `config.out_zip`.
///
/// Files are compressed on a worker pool but land in the archive in
/// name order; noise entries follow, then the comment and poison bytes,
/// all drawing from one RNG stream so seeded builds are reproducible.
/// Staged temp files are gone by the time this returns, success or not.
pub fn build(config: &Config, host: &Host) -> Result<BuildReport, Error> {
    config.validate()?;

    let files = collect_sources(config, host)?;
    if files.is_empty() {
        return Err(Error::EmptyInput {
            dir: config.src_dir.clone(),
        });
    }
    debug!(files = files.len(), "source walk complete");

    let total = files.len() as u64 + config.noise_files as u64;
    let done = AtomicU64::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(io::Error::other)?;
    // par_iter keeps result order equal to input order, and the collect
    // into Result aborts on the first failed file
    let mut entries = pool.install(|| {
        files
            .par_iter()
            .map(|spec| {
                let entry = entry::stage_file(config, spec)?;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                host.progress(n, total, &spec.rel_name);
                Ok(entry)
            })
            .collect::<Result<Vec<Entry>, Error>>()
    })?;

    // noise stays on this thread: it must consume the RNG stream in index
    // order for seeded runs to reproduce
    let mut rng = NoiseRng::from_seed(config.seed);
    for index in 0..config.noise_files {
        let entry = entry::stage_noise(config, index, &mut rng)?;
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        host.progress(n, total, &String::from_utf8_lossy(&entry.name_bytes));
        entries.push(entry);
    }

    let report = assembler::assemble(config, &mut entries, &mut rng)?;
    // dropping the entries unlinks every staged temp file
    drop(entries);
    Ok(report)
}

/// Walk the source tree and return one spec per regular file, stably
/// sorted by encoded name so the archive layout is a function of the
/// input.
fn collect_sources(config: &Config, host: &Host) -> Result<Vec<FileSpec>, Error> {
    let mut files = Vec::new();
    let walker = WalkDir::new(&config.src_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            // pruning a hidden directory skips its whole subtree; the root
            // itself is always kept
            e.depth() == 0 || config.include_hidden || !host.hidden(e.path())
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(&config.src_dir)
            .map_err(|_| io::Error::other("walked path escaped the source root"))?;
        let rel_name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let name_bytes = config.encoding.encode(&rel_name)?;
        let mtime = entry.metadata().map_err(io::Error::from)?.modified()?;
        files.push(FileSpec {
            path: entry.into_path(),
            rel_name,
            name_bytes,
            mtime,
        });
    }

    files.sort_by(|a, b| a.name_bytes.cmp(&b.name_bytes));
    Ok(files)
}
