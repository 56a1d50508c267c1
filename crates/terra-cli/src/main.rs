//! `terra` - a thin demonstration CLI over the `terra-image` core crates.
//!
//! Exercises the lazy view algebra, the cached parallel block rasterizer,
//! the disk-I/O boundary, and the tiled feature-detection pipeline against
//! real files on disk, via the `.traw` reference driver (`terra_cli::raw_driver`).

// Mirrors the log-argument shape of this workspace's other CLI: `None` means
// no logging, `Some(None)` means "log to the default path", `Some(Some(p))`
// means a custom path.
#![allow(clippy::option_option)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use terra_cli::commands::{self, convert::ConvertArgs, detect::DetectArgs, info::InfoArgs};

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

struct Logger {
    file: File,
}

impl Logger {
    fn new(path: &PathBuf) -> std::io::Result<Self> {
        let file = File::options().append(true).create(true).open(path)?;
        Ok(Self { file })
    }

    fn log(&mut self, msg: &str) {
        let _ = writeln!(self.file, "{msg}");
    }
}

pub fn log(msg: &str) {
    eprintln!("{msg}");
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.log(msg);
        }
    }
}

fn get_default_log_path() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        let mut log_path = exe_path;
        log_path.set_extension("log");
        log_path
    } else {
        PathBuf::from("terra.log")
    }
}

/// Maps `-v`/`-vv`/`-vvv` to a `tracing` filter, the same verbosity ladder
/// this workspace's other CLI uses.
fn init_tracing(verbose: u8, log_path: Option<&PathBuf>) {
    let filter = match verbose {
        0 => "warn",
        1 => "terra=info",
        2 => "terra=debug",
        _ => "terra=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if let Some(path) = log_path {
        let log_dir = path.parent().unwrap_or(Path::new("."));
        let log_filename = path.file_name().unwrap_or(std::ffi::OsStr::new("terra.log"));
        let file_appender = tracing_appender::rolling::never(log_dir, log_filename);

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .with_ansi(false)
            .with_writer(file_appender)
            .init();
    } else if verbose > 0 {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).with_timer(fmt::time::uptime()).init();
    }
}

#[derive(Parser)]
#[command(name = "terra")]
#[command(author, version, about = "terra-image demonstration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write log to file (-l default, -l path.log custom).
    #[arg(short = 'l', long = "log", global = true)]
    log: Option<Option<PathBuf>>,

    /// Number of worker threads for the rayon global pool (0 = auto).
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Display image format and file info (like iinfo).
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Recast pixel format/channel kind and write to a new file.
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Run a reference feature detector (gftt/orb) and report keypoints.
    #[command(visible_alias = "d")]
    Detect(DetectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(get_default_log_path()),
        None => None,
    };

    init_tracing(cli.verbose, log_path.as_ref());

    if let Some(ref path) = log_path {
        if let Ok(logger) = Logger::new(path) {
            if let Ok(mut guard) = LOGGER.lock() {
                *guard = Some(logger);
            }
            if cli.verbose > 0 {
                log(&format!("logging to: {}", path.display()));
            }
        }
    }

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global().context("failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Convert(args) => commands::convert::run(args, cli.verbose),
        Commands::Detect(args) => commands::detect::run(args, cli.verbose),
    }
}
