//! CAN Capture CLI Application
//!
//! Command-line front end for the can-capture library:
//! - List the filtered frame table, optionally interpreted through DBC files
//! - Print or save per-identifier statistics (text or JSON)
//! - Save the filter table of a capture

use anyhow::{Context, Result};
use can_capture::format::{parse_number, FrameRow, COLUMN_HEADERS};
use can_capture::{write_csv, FrameDecoder};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod capture;
mod config;
mod stats;

use capture::CaptureArgs;
use config::AppConfig;

/// CAN Capture - Inspect and analyze CAN bus captures
#[derive(Parser, Debug)]
#[command(name = "can-capture")]
#[command(about = "Inspect and analyze CAN bus captures", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the filtered frame table
    List {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Path to DBC file(s) used to interpret payloads (can be repeated)
        #[arg(long, value_name = "FILE")]
        dbc: Vec<PathBuf>,

        /// Show timestamps in seconds
        #[arg(long)]
        seconds: bool,

        /// Maximum number of rows to print
        #[arg(long, value_name = "COUNT")]
        limit: Option<usize>,

        /// Write the filtered frames to a CSV capture instead of printing
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Per-identifier statistics
    Stats {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Identifier to analyze (can be repeated)
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<String>,

        /// Analyze every identifier not hidden by the filter table
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Emit JSON instead of text reports
        #[arg(long)]
        json: bool,

        /// Directory to write one report per identifier
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Print or save the filter table
    Filters {
        #[command(flatten)]
        capture: CaptureArgs,

        /// File to save the filter table to (default: stdout)
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Capture CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using capture library v{}", can_capture::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    match &args.command {
        Command::List {
            capture,
            dbc,
            seconds,
            limit,
            export,
        } => list_command(&config, capture, dbc, *seconds, *limit, export.as_deref()),
        Command::Stats {
            capture,
            ids,
            all,
            json,
            output,
        } => stats_command(&config, capture, ids, *all, *json, output.as_deref()),
        Command::Filters { capture, save } => filters_command(&config, capture, save.as_deref()),
    }
}

fn list_command(
    config: &AppConfig,
    capture: &CaptureArgs,
    dbc: &[PathBuf],
    seconds: bool,
    limit: Option<usize>,
    export: Option<&Path>,
) -> Result<()> {
    let store = capture::load_store(capture, config)?;
    let limit = limit.unwrap_or(usize::MAX);

    if let Some(path) = export {
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        write_csv(store.filtered().iter().take(limit), BufWriter::new(file))
            .with_context(|| format!("Failed to write capture: {:?}", path))?;
        log::info!("Exported {} frames to {:?}", store.filtered_len().min(limit), path);
        return Ok(());
    }

    let decoder = capture::load_decoder(dbc, config)?;
    let options = config
        .display
        .with_number_base(capture.number_base(config))
        .with_seconds(seconds || config.display.seconds)
        .with_interpret(decoder.is_some() || config.display.interpret);
    let decoder = decoder.as_ref().map(|d| d as &dyn FrameDecoder);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{}", COLUMN_HEADERS.join("\t"))?;
    for frame in store.filtered().iter().take(limit) {
        let row = FrameRow::render(frame, &options, decoder);
        writeln!(out, "{}", row.columns().join("\t"))?;
    }
    out.flush()?;

    Ok(())
}

fn stats_command(
    config: &AppConfig,
    capture: &CaptureArgs,
    ids: &[String],
    all: bool,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let base = capture.number_base(config);
    let identifiers = ids
        .iter()
        .map(|text| parse_number(text, base).with_context(|| format!("Invalid identifier: {}", text)))
        .collect::<Result<Vec<u32>>>()?;

    if identifiers.is_empty() && !all {
        anyhow::bail!("Specify --id <ID> or --all");
    }

    let store = capture::load_store(capture, config)?;
    let snapshots = stats::store_snapshots(&store, &identifiers);

    if snapshots.is_empty() {
        log::warn!("No matching frames in {:?}", capture.capture);
    }

    match output.or(config.output.report_dir.as_deref()) {
        Some(dir) => stats::write_reports(&snapshots, base, dir)?,
        None if json => println!("{}", stats::render_json(&snapshots)?),
        None => print!("{}", stats::render_text(&snapshots, base)),
    }

    Ok(())
}

fn filters_command(config: &AppConfig, capture: &CaptureArgs, save: Option<&Path>) -> Result<()> {
    let store = capture::load_store(capture, config)?;

    match save {
        Some(path) => store
            .save_filter_file(path)
            .with_context(|| format!("Failed to save filter table: {:?}", path))?,
        None => {
            let stdout = io::stdout();
            store.save_filters(stdout.lock())?;
        }
    }

    let visible = store.filters().iter().filter(|(_, visible)| *visible).count();
    log::info!("{} of {} identifiers visible", visible, store.filters().len());

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
