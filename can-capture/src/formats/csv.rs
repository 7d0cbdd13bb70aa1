//! Native CSV capture format
//!
//! ```text
//! Time Stamp,ID,Extended,Dir,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8
//! 166064000,0000021A,false,Rx,0,8,FE,36,12,FE,69,05,07,AD,
//! ```
//!
//! Timestamps are decimal microseconds, identifiers and bytes are hex. Older
//! captures without the `Dir` column are read as received frames.

use crate::formats::CaptureFileReader;
use crate::types::{CaptureError, Direction, Frame, Result, MAX_PAYLOAD};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;

/// Header written by [`write_csv`]
pub const CSV_HEADER: &str = "Time Stamp,ID,Extended,Dir,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8";

/// Streaming reader for CSV captures
pub struct CsvCaptureReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    has_direction: bool,
    /// First line, when it turned out not to be a header
    pending: Option<String>,
}

impl<R: BufRead> CsvCaptureReader<R> {
    /// Wrap a reader, consuming the header line if there is one
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let mut has_direction = true;
        let mut pending = None;

        if let Some(first) = lines.next() {
            let first = first?;
            if first.trim_start().to_ascii_lowercase().starts_with("time stamp") {
                has_direction = first.split(',').any(|col| col.trim().eq_ignore_ascii_case("dir"));
            } else {
                pending = Some(first);
            }
        }

        log::debug!("CSV capture has direction column: {}", has_direction);

        Ok(Self {
            lines,
            line_no: 1,
            has_direction,
            pending,
        })
    }

    fn parse_line(&self, line: &str) -> Result<Frame> {
        let parse_err = |reason: String| CaptureError::Parse {
            line: self.line_no,
            reason,
        };

        let mut cols = line.split(',').map(str::trim);
        let mut next_col = |name: &str| {
            cols.next()
                .filter(|col| !col.is_empty())
                .ok_or_else(|| parse_err(format!("missing {} column", name)))
        };

        let timestamp = next_col("timestamp")?;
        let timestamp = timestamp
            .parse::<u64>()
            .map_err(|_| parse_err(format!("bad timestamp {:?}", timestamp)))?;

        let id_text = next_col("ID")?;
        let identifier = parse_hex(id_text).ok_or_else(|| parse_err(format!("bad ID {:?}", id_text)))?;

        let extended = match next_col("extended")?.to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => return Err(parse_err(format!("bad extended flag {:?}", other))),
        };

        let direction = if self.has_direction {
            let token = next_col("direction")?;
            Direction::from_token(token)
                .ok_or_else(|| parse_err(format!("bad direction {:?}", token)))?
        } else {
            Direction::Received
        };

        let bus_text = next_col("bus")?;
        let bus = bus_text
            .parse::<u8>()
            .map_err(|_| parse_err(format!("bad bus {:?}", bus_text)))?;

        let len_text = next_col("length")?;
        let length = len_text
            .parse::<u8>()
            .ok()
            .filter(|&len| len as usize <= MAX_PAYLOAD)
            .ok_or_else(|| parse_err(format!("bad length {:?}", len_text)))?;

        let mut payload = [0u8; MAX_PAYLOAD];
        for (index, byte) in payload.iter_mut().take(length as usize).enumerate() {
            let text = next_col("data")?;
            *byte = parse_hex(text)
                .and_then(|value| u8::try_from(value).ok())
                .ok_or_else(|| parse_err(format!("bad data byte D{} {:?}", index + 1, text)))?;
        }

        Ok(Frame {
            identifier,
            extended,
            timestamp,
            bus,
            direction,
            length,
            payload,
        })
    }
}

impl CsvCaptureReader<BufReader<File>> {
    /// Open a CSV capture file
    pub fn open_file(path: &Path) -> Result<Self> {
        log::info!("Opening CSV capture: {:?}", path);
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl CaptureFileReader for CsvCaptureReader<BufReader<File>> {
    fn open(path: &Path) -> Result<Self> {
        Self::open_file(path)
    }
}

impl<R: BufRead> Iterator for CsvCaptureReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => {
                    self.line_no += 1;
                    match self.lines.next()? {
                        Ok(line) => line,
                        Err(e) => return Some(Err(e.into())),
                    }
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}

fn parse_hex(text: &str) -> Option<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

/// Write frames in the CSV capture format, header included
pub fn write_csv<'a, W: Write>(frames: impl IntoIterator<Item = &'a Frame>, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for frame in frames {
        write!(
            writer,
            "{},{:08X},{},{},{},{},",
            frame.timestamp,
            frame.identifier,
            frame.extended,
            frame.direction.token(),
            frame.bus,
            frame.data_len(),
        )?;
        for byte in frame.data() {
            write!(writer, "{:02X},", byte)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
