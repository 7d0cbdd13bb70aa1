//! Capture file formats
//!
//! Each reader implements an iterator pattern over [`Frame`] results so
//! frames can be streamed straight into a store.

use crate::types::{Frame, Result};
use std::path::Path;

pub mod csv;

pub use csv::{write_csv, CsvCaptureReader};

/// Common trait for all capture file readers
pub trait CaptureFileReader: Iterator<Item = Result<Frame>> + Sized {
    /// Open a capture file and return an iterator over its frames
    fn open(path: &Path) -> Result<Self>;
}
