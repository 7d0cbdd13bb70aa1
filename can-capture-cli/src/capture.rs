//! Capture loading
//!
//! Reads a capture file into a [`FrameStore`], then applies the time base,
//! filter table and hidden identifiers requested on the command line or in
//! the configuration file.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use can_capture::format::parse_number;
use can_capture::formats::CaptureFileReader;
use can_capture::{
    CsvCaptureReader, DbcDecoder, FrameStore, IngestMode, NumberBase, StoreEvent, StoreObserver,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by every subcommand that loads a capture
#[derive(clap::Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Path to the CSV capture file
    #[arg(short = 'i', long, value_name = "FILE")]
    pub capture: PathBuf,

    /// Keep only the latest frame of each identifier
    #[arg(long)]
    pub dedup: bool,

    /// Rebase timestamps so the first frame sits at 0
    #[arg(long)]
    pub normalize: bool,

    /// Filter table to apply after loading
    #[arg(long, value_name = "FILE")]
    pub filters: Option<PathBuf>,

    /// Identifier to hide (can be repeated)
    #[arg(long, value_name = "ID")]
    pub hide: Vec<String>,

    /// Render and parse numbers in decimal instead of hex
    #[arg(long)]
    pub decimal: bool,
}

impl CaptureArgs {
    /// Number base selected by flags, falling back to the configuration
    pub fn number_base(&self, config: &AppConfig) -> NumberBase {
        if self.decimal {
            NumberBase::Decimal
        } else {
            config.display.number_base
        }
    }
}

/// Logs store notifications while a capture is being prepared
struct EventLogger;

impl StoreObserver for EventLogger {
    fn on_store_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::RowsAppended { first, count } => {
                log::debug!("Rows {}..{} visible", first, first + count)
            }
            StoreEvent::FiltersChanged => log::debug!("Filter set changed"),
            StoreEvent::ResetBegin | StoreEvent::ResetEnd => log::trace!("{:?}", event),
        }
    }
}

/// Load the capture and apply every requested view setting
pub fn load_store(args: &CaptureArgs, config: &AppConfig) -> Result<FrameStore> {
    let mut store_config = config.store.clone();
    if args.dedup {
        store_config = store_config.with_ingest_mode(IngestMode::Dedup);
    }

    let mut store = FrameStore::with_config(&store_config);
    store.add_observer(Arc::new(EventLogger));

    let reader = CsvCaptureReader::<BufReader<File>>::open(&args.capture)
        .with_context(|| format!("Failed to open capture: {:?}", args.capture))?;
    let frames = reader
        .collect::<can_capture::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read capture: {:?}", args.capture))?;

    match store.ingest_mode() {
        IngestMode::Append => store.ingest_batch(&frames),
        IngestMode::Dedup => {
            for frame in frames {
                store.ingest(frame, false);
            }
        }
    }
    store.flush_appended_rows();
    log::info!(
        "Loaded {} frames, {} identifiers",
        store.len(),
        store.catalog().len()
    );

    if args.normalize || config.input.normalize_time {
        store.normalize_time();
    }

    if let Some(path) = args.filters.as_ref().or(config.input.filter_file.as_ref()) {
        store
            .load_filter_file(path)
            .with_context(|| format!("Failed to load filter table: {:?}", path))?;
    }

    let base = args.number_base(config);
    for text in &args.hide {
        let identifier = parse_number(text, base)
            .with_context(|| format!("Invalid identifier: {}", text))?;
        if !store.catalog().contains(identifier) {
            log::warn!("Identifier {} does not occur in the capture", text);
        }
        store.set_filter_visible(identifier, false);
    }

    Ok(store)
}

/// Build a decoder from DBC files given on the command line and in the
/// configuration. Returns `None` when there are none.
pub fn load_decoder(dbc: &[PathBuf], config: &AppConfig) -> Result<Option<DbcDecoder>> {
    let paths: Vec<&PathBuf> = dbc.iter().chain(&config.input.dbc_files).collect();
    if paths.is_empty() {
        return Ok(None);
    }

    let mut decoder = DbcDecoder::new();
    for path in paths {
        decoder
            .add_dbc(path)
            .with_context(|| format!("Failed to load DBC: {:?}", path))?;
    }

    let (messages, signals) = decoder.definition_counts();
    log::info!("Signal database: {} messages, {} signals", messages, signals);
    Ok(Some(decoder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn capture_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Time Stamp,ID,Extended,Dir,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8").unwrap();
        writeln!(file, "1000,00000100,false,Rx,0,1,01,").unwrap();
        writeln!(file, "1100,00000200,false,Rx,0,1,02,").unwrap();
        writeln!(file, "1200,00000100,false,Rx,0,1,03,").unwrap();
        file.flush().unwrap();
        file
    }

    fn args(file: &NamedTempFile) -> CaptureArgs {
        CaptureArgs {
            capture: file.path().to_path_buf(),
            dedup: false,
            normalize: false,
            filters: None,
            hide: Vec::new(),
            decimal: false,
        }
    }

    #[test]
    fn test_load_with_hidden_identifier() {
        let file = capture_file();
        let mut args = args(&file);
        args.hide = vec!["0x200".to_string()];
        args.normalize = true;

        let store = load_store(&args, &AppConfig::default()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.filtered_len(), 2);
        assert_eq!(store.history()[0].timestamp, 0);
    }

    #[test]
    fn test_load_dedup() {
        let file = capture_file();
        let mut args = args(&file);
        args.dedup = true;

        let store = load_store(&args, &AppConfig::default()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.history()[0].data(), &[3]);
    }

    #[test]
    fn test_no_decoder_without_dbc() {
        assert!(load_decoder(&[], &AppConfig::default()).unwrap().is_none());
    }
}
