use clap::{Parser, Subcommand, ValueEnum};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use noisy_zip::encoding::NameEncoding;
use noisy_zip::{build, recover, recover_to_zip, Compression, Config, Host, Strategy};

use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "noisy-zip", version, about = "Writes hostile zip archives and recovers damaged ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an archive from a directory, with optional noise
    Build {
        src: PathBuf,
        out: PathBuf,

        /// JSON file carrying the same knobs as the flags; flags win
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store entries instead of deflating them
        #[arg(long)]
        store: bool,

        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,

        /// Zero sizes in local headers, move the truth to data
        /// descriptors, and append a poison tail
        #[arg(long)]
        overwrite_central_dir: bool,

        /// Append this many random comment bytes after the EOCD
        #[arg(long)]
        comment_size: Option<u16>,

        /// Collapse all timestamps to 1980-01-01
        #[arg(long)]
        fixed_time: bool,

        /// Number of synthetic .junk/ entries
        #[arg(long)]
        noise_files: Option<u32>,

        /// Payload bytes per synthetic entry
        #[arg(long)]
        noise_size: Option<u32>,

        /// Deflate level, 0..=9
        #[arg(long)]
        level: Option<u8>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Compression worker threads, defaults to the CPU count
        #[arg(long)]
        workers: Option<usize>,

        /// Seed for reproducible noise
        #[arg(long)]
        seed: Option<i64>,

        /// Archive hidden files too
        #[arg(long)]
        include_hidden: bool,
    },

    /// Scan a damaged archive and write every recoverable file to a directory
    Recover {
        zipfile: PathBuf,

        #[arg(long, default_value = "recovered")]
        dir: PathBuf,
    },

    /// Recover a damaged archive and repack it as a clean zip
    Repair { zipfile: PathBuf, out: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum EncodingArg {
    Utf8,
    Cp1251,
}

impl From<EncodingArg> for NameEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf8 => NameEncoding::Utf8,
            EncodingArg::Cp1251 => NameEncoding::Cp1251,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum StrategyArg {
    Default,
    Filtered,
    Huffman,
    Rle,
    Fixed,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::Huffman => Strategy::HuffmanOnly,
            StrategyArg::Rle => Strategy::Rle,
            StrategyArg::Fixed => Strategy::Fixed,
        }
    }
}

/// The JSON side of the build knobs. Everything is optional; explicit
/// flags override whatever the file says.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    store: Option<bool>,
    encoding: Option<EncodingArg>,
    overwrite_central_dir: Option<bool>,
    comment_size: Option<u16>,
    fixed_time: Option<bool>,
    noise_files: Option<u32>,
    noise_size: Option<u32>,
    level: Option<u8>,
    strategy: Option<StrategyArg>,
    workers: Option<usize>,
    seed: Option<i64>,
    include_hidden: Option<bool>,
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = do_main(Cli::parse()) {
        eprintln!("noisy-zip: {e}");
        std::process::exit(1);
    }
}

fn progress_host() -> Host {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{pos}/{len} {wide_msg}").expect("static template"),
    );
    let log_bar = bar.clone();
    Host::new()
        .with_progress(move |done, total, name| {
            bar.set_length(total);
            bar.set_position(done);
            bar.set_message(name.to_string());
        })
        .with_log(move |message| {
            log_bar.println(message);
        })
}

fn do_main(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Build {
            src,
            out,
            config: config_path,
            store,
            encoding,
            overwrite_central_dir,
            comment_size,
            fixed_time,
            noise_files,
            noise_size,
            level,
            strategy,
            workers,
            seed,
            include_hidden,
        } => {
            let file: FileConfig = match &config_path {
                Some(path) => serde_json::from_slice(&fs::read(path)?)?,
                None => FileConfig::default(),
            };

            let mut config = Config::new(&src, &out);
            config.compression = if store || file.store.unwrap_or(false) {
                Compression::Store
            } else {
                Compression::Deflate
            };
            if let Some(encoding) = encoding.or(file.encoding) {
                config.encoding = encoding.into();
            }
            config.overwrite_central_dir =
                overwrite_central_dir || file.overwrite_central_dir.unwrap_or(false);
            if let Some(size) = comment_size.or(file.comment_size) {
                config.comment_size = size;
            }
            config.fixed_time = fixed_time || file.fixed_time.unwrap_or(false);
            if let Some(n) = noise_files.or(file.noise_files) {
                config.noise_files = n;
            }
            if let Some(n) = noise_size.or(file.noise_size) {
                config.noise_size = n;
            }
            if let Some(level) = level.or(file.level) {
                config.level = level;
            }
            if let Some(strategy) = strategy.or(file.strategy) {
                config.strategy = strategy.into();
            }
            if let Some(workers) = workers.or(file.workers) {
                config.workers = workers;
            }
            config.seed = seed.or(file.seed);
            config.include_hidden = include_hidden || file.include_hidden.unwrap_or(false);

            let report = build(&config, &progress_host())?;
            println!(
                "wrote {} entries ({}) to {}",
                report.entries,
                format_size(report.bytes_written, BINARY),
                out.display()
            );
        }
        Commands::Recover { zipfile, dir } => {
            let report = recover(&zipfile, &dir, &progress_host())?;
            println!(
                "recovered {} of {} candidates into {} ({} skipped)",
                report.recovered.len(),
                report.candidates,
                dir.display(),
                report.skipped
            );
        }
        Commands::Repair { zipfile, out } => {
            let report = recover_to_zip(&zipfile, &out, &progress_host())?;
            println!(
                "repacked {} entries ({}) into {}",
                report.entries,
                format_size(report.bytes_written, BINARY),
                out.display()
            );
        }
    }
    Ok(())
}
