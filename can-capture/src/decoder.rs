//! Frame decoder collaborator
//!
//! The store never interprets payloads itself. Viewers that want a textual
//! rendering of signals consult a [`FrameDecoder`]; [`DbcDecoder`] is the
//! implementation backed by DBC signal definitions.

use crate::message_decoder::MessageDecoder;
use crate::signals::SignalDatabase;
use crate::types::{Frame, Result};
use std::path::Path;

/// A frame interpreted by a [`FrameDecoder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Message name from the definition
    pub name: String,
    /// One rendered line per decoded signal, in definition order
    pub fields: Vec<String>,
}

/// Narrow query interface for payload interpretation
pub trait FrameDecoder: Send + Sync {
    /// Interpret `frame`, or `None` when no definition matches
    fn decode(&self, frame: &Frame) -> Option<DecodedMessage>;
}

/// Decoder backed by signal definitions loaded from DBC files
pub struct DbcDecoder {
    signal_db: SignalDatabase,
}

impl DbcDecoder {
    pub fn new() -> Self {
        Self {
            signal_db: SignalDatabase::new(),
        }
    }

    /// Load a DBC file and add its definitions
    ///
    /// # Example
    /// ```no_run
    /// use can_capture::DbcDecoder;
    /// use std::path::Path;
    ///
    /// let mut decoder = DbcDecoder::new();
    /// decoder.add_dbc(Path::new("powertrain.dbc")).unwrap();
    /// ```
    pub fn add_dbc(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading DBC file: {:?}", path);

        let messages = crate::signals::dbc::parse_dbc_file(path)?;
        for message in messages {
            self.signal_db.add_message(message);
        }

        log::info!("DBC file loaded successfully: {:?}", path);
        Ok(())
    }

    /// Add definitions from DBC text already in memory
    pub fn add_dbc_str(&mut self, content: &str, source: &str) -> Result<()> {
        let messages = crate::signals::dbc::parse_dbc_str(content, source)?;
        for message in messages {
            self.signal_db.add_message(message);
        }
        Ok(())
    }

    /// Number of (messages, signals) loaded
    pub fn definition_counts(&self) -> (usize, usize) {
        self.signal_db.counts()
    }
}

impl Default for DbcDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for DbcDecoder {
    fn decode(&self, frame: &Frame) -> Option<DecodedMessage> {
        let message_def = self.signal_db.get_message(frame.identifier)?;
        log::trace!("Decoding message: {} (ID 0x{:X})", message_def.name, frame.identifier);
        MessageDecoder::decode_message(frame.data(), message_def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DBC: &str = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2
"#;

    #[test]
    fn test_empty_decoder_knows_nothing() {
        let decoder = DbcDecoder::new();
        assert_eq!(decoder.definition_counts(), (0, 0));
        assert!(decoder.decode(&Frame::new(291, 0, &[0; 8])).is_none());
    }

    #[test]
    fn test_decode_known_message() {
        let mut decoder = DbcDecoder::new();
        decoder.add_dbc_str(DBC, "inline.dbc").unwrap();
        assert_eq!(decoder.definition_counts(), (1, 2));

        let frame = Frame::new(291, 0, &[0xE8, 0x03, 0x5A, 0, 0, 0, 0, 0]);
        let decoded = decoder.decode(&frame).unwrap();

        assert_eq!(decoded.name, "EngineData");
        assert_eq!(decoded.fields, vec!["EngineSpeed: 1000 rpm", "EngineTemp: 50.000 C"]);
    }

    #[test]
    fn test_decode_motorola_signals() {
        let dbc = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 512 Gearbox: 2 ECU1
 SG_ Word : 7|16@0+ (1,0) [0|65535] "" ECU1
 SG_ High : 7|8@0+ (1,0) [0|255] "" ECU1
"#;
        let mut decoder = DbcDecoder::new();
        decoder.add_dbc_str(dbc, "motorola.dbc").unwrap();

        let decoded = decoder.decode(&Frame::new(512, 0, &[0x12, 0x34])).unwrap();
        assert_eq!(decoded.fields, vec!["Word: 4660", "High: 18"]);
    }
}
